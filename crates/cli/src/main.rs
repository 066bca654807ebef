//! Callsight CLI
//!
//! Main entry point for the callsight command-line tool.
//! Imports call logs, keeps their embeddings current, and answers
//! questions about them from the terminal or over HTTP.

mod commands;
mod server;
mod services;

use callsight_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ColumnsCommand, ImportCommand, IngestCommand, PromptsCommand, ServeCommand,
    StatsCommand,
};
use std::path::PathBuf;
use tracing::Instrument;

/// Callsight CLI - ask questions about call-center logs
#[derive(Parser, Debug)]
#[command(name = "callsight")]
#[command(about = "Ask questions about call-center logs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CALLSIGHT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CALLSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite record store
    #[arg(long, global = true, env = "CALLSIGHT_DATABASE")]
    database: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "CALLSIGHT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the imported call logs
    Ask(AskCommand),

    /// Generate embeddings for call logs that lack one
    Ingest(IngestCommand),

    /// Import call logs from a CSV, JSON or JSON-lines file
    Import(ImportCommand),

    /// Show or change the columns available for analysis
    Columns(ColumnsCommand),

    /// List prompt definitions
    Prompts(PromptsCommand),

    /// Show record counts and token usage
    Stats(StatsCommand),

    /// Serve the chat endpoints over HTTP
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment and the workspace config file
    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.database,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = LogFormat::parse(&config.log_format).unwrap_or_default();
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Callsight CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Embedding provider: {}", config.embedding.provider);
    tracing::debug!(
        "Completion provider: {} ({})",
        config.completion.provider,
        config.completion.model
    );

    // Ensure .callsight directory exists
    config.ensure_callsight_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Ingest(_) => "ingest",
        Commands::Import(_) => "import",
        Commands::Columns(_) => "columns",
        Commands::Prompts(_) => "prompts",
        Commands::Stats(_) => "stats",
        Commands::Serve(_) => "serve",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Ingest(cmd) => cmd.execute(&config).await,
            Commands::Import(cmd) => cmd.execute(&config).await,
            Commands::Columns(cmd) => cmd.execute(&config).await,
            Commands::Prompts(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
