//! Configuration management for Callsight.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (`.callsight/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with the record store, prompts and
//! usage ledger stored under `.callsight/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];
const KNOWN_COMPLETION_PROVIDERS: [&str; 2] = ["anthropic", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .callsight/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// SQLite database override (default: .callsight/callsight.sqlite)
    pub database_path: Option<PathBuf>,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,

    /// Completion service settings
    pub completion: CompletionSettings,

    /// Similarity query tunables
    pub retrieval: RetrievalSettings,

    /// Ingestion job tunables
    pub ingest: IngestSettings,

    /// HTTP surface settings
    pub server: ServerSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "openai", "ollama" or "trigram"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
        }
    }
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    /// "anthropic" or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: u32,
    /// How system messages reach the backend: "native" or "user".
    /// Unset means the backend default.
    pub system_role: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-opus-20240229".to_string(),
            endpoint: None,
            api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            max_tokens: 1000,
            system_role: None,
        }
    }
}

/// Similarity query tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Minimum similarity for a match, in [0, 1]
    pub match_threshold: f32,
    /// Maximum number of matches
    pub match_count: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            match_count: 10,
        }
    }
}

/// Ingestion job tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestSettings {
    /// Maximum candidate records per run
    pub batch_size: usize,
    /// Embedding calls in flight at once
    pub concurrency: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            concurrency: 1,
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    database: Option<DatabaseConfig>,
    embedding: Option<EmbeddingSettings>,
    completion: Option<CompletionSettings>,
    retrieval: Option<RetrievalSettings>,
    ingest: Option<IngestSettings>,
    server: Option<ServerSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            database_path: None,
            embedding: EmbeddingSettings::default(),
            completion: CompletionSettings::default(),
            retrieval: RetrievalSettings::default(),
            ingest: IngestSettings::default(),
            server: ServerSettings::default(),
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `CALLSIGHT_WORKSPACE`: Override workspace path
    /// - `CALLSIGHT_CONFIG`: Path to config file
    /// - `CALLSIGHT_DATABASE`: Path to the SQLite record store
    /// - `CALLSIGHT_EMBEDDING_PROVIDER`: Embedding provider
    /// - `CALLSIGHT_COMPLETION_PROVIDER`: Completion provider
    /// - `CALLSIGHT_MODEL`: Completion model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over the environment before the YAML file is read.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CALLSIGHT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if let Ok(config_file) = std::env::var("CALLSIGHT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.callsight_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(db) = std::env::var("CALLSIGHT_DATABASE") {
            config.database_path = Some(PathBuf::from(db));
        }

        if let Ok(provider) = std::env::var("CALLSIGHT_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(provider) = std::env::var("CALLSIGHT_COMPLETION_PROVIDER") {
            config.completion.provider = provider;
        }

        if let Ok(model) = std::env::var("CALLSIGHT_MODEL") {
            config.completion.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.database.and_then(|db| db.path) {
            result.database_path = Some(PathBuf::from(path));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(completion) = config_file.completion {
            result.completion = completion;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(ingest) = config_file.ingest {
            result.ingest = ingest;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        database: Option<PathBuf>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(database) = database {
            self.database_path = Some(database);
        }

        if let Some(model) = model {
            self.completion.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .callsight directory.
    pub fn callsight_dir(&self) -> PathBuf {
        self.workspace.join(".callsight")
    }

    /// Ensure the .callsight directory exists.
    pub fn ensure_callsight_dir(&self) -> AppResult<()> {
        let dir = self.callsight_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .callsight directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the SQLite record store.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.callsight_dir().join("callsight.sqlite"))
    }

    /// Path of the caller-side token usage ledger.
    pub fn usage_log_path(&self) -> PathBuf {
        self.callsight_dir().join("usage.jsonl")
    }

    /// Read an API key from the named environment variable.
    pub fn resolve_api_key(env_var: Option<&str>) -> Option<String> {
        env_var
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        let embedding = &self.embedding.provider;
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let completion = &self.completion.provider;
        if !KNOWN_COMPLETION_PROVIDERS.contains(&completion.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown completion provider: {}. Supported: {}",
                completion,
                KNOWN_COMPLETION_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=1.0).contains(&self.retrieval.match_threshold) {
            return Err(AppError::Config(format!(
                "retrieval.matchThreshold must be within [0, 1], got {}",
                self.retrieval.match_threshold
            )));
        }

        if self.retrieval.match_count == 0 {
            return Err(AppError::Config(
                "retrieval.matchCount must be at least 1".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 || self.ingest.concurrency == 0 {
            return Err(AppError::Config(
                "ingest.batchSize and ingest.concurrency must be at least 1".to_string(),
            ));
        }

        if embedding == "openai" {
            require_key(self.embedding.api_key_env.as_deref())?;
        }

        if completion == "anthropic" {
            require_key(self.completion.api_key_env.as_deref())?;
        }

        Ok(())
    }
}

fn require_key(env_var: Option<&str>) -> AppResult<()> {
    match env_var {
        Some(name) if std::env::var(name).is_ok() => Ok(()),
        Some(name) => Err(AppError::Config(format!(
            "API key not found in environment variable: {}",
            name
        ))),
        None => Err(AppError::Config("apiKeyEnv is not configured".to_string())),
    }
}
