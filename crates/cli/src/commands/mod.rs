//! Command handlers for the Callsight CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod columns;
pub mod import;
pub mod ingest;
pub mod prompts;
pub mod serve;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use columns::ColumnsCommand;
pub use import::ImportCommand;
pub use ingest::IngestCommand;
pub use prompts::PromptsCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;
