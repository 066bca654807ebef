//! Construction of stores and providers from configuration.

use callsight_core::config::{AppConfig, CompletionSettings};
use callsight_core::AppResult;
use callsight_knowledge::{
    create_provider, ChatOrchestrator, EmbeddingProvider, IngestionJob, SqliteStore, UsageLedger,
};
use callsight_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Open the record store configured for this workspace.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<SqliteStore>> {
    let path = config.database_path();
    tracing::debug!("Using record store at {:?}", path);
    Ok(Arc::new(SqliteStore::open(&path)?))
}

pub fn embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let api_key = AppConfig::resolve_api_key(config.embedding.api_key_env.as_deref());
    create_provider(&config.embedding, api_key.as_deref())
}

pub fn completion_client(settings: &CompletionSettings) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = AppConfig::resolve_api_key(settings.api_key_env.as_deref());
    create_client(settings, api_key.as_deref())
}

pub fn usage_ledger(config: &AppConfig) -> UsageLedger {
    UsageLedger::new(config.usage_log_path())
}

/// Chat orchestrator over `store`, with completion settings possibly overridden per call.
pub fn orchestrator(
    config: &AppConfig,
    store: &Arc<SqliteStore>,
    completion: &CompletionSettings,
) -> AppResult<ChatOrchestrator> {
    Ok(ChatOrchestrator::new(
        embedder(config)?,
        store.clone(),
        store.clone(),
        completion_client(completion)?,
        completion,
    )
    .with_retrieval(&config.retrieval))
}

pub fn ingestion_job(config: &AppConfig, store: &Arc<SqliteStore>) -> AppResult<IngestionJob> {
    Ok(
        IngestionJob::new(store.clone(), store.clone(), embedder(config)?)
            .with_settings(&config.ingest),
    )
}
