//! Embedding provider trait and factory.

use super::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use callsight_core::config::EmbeddingSettings;
use callsight_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::malformed(self.provider_name(), "no embedding returned"))
    }
}

/// Create an embedding provider from settings.
///
/// # Errors
/// `AppError::Config` for unknown providers or a missing OpenAI key.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        provider = %settings.provider,
        model = %settings.model,
        dimensions = settings.dimensions,
        "Creating embedding provider"
    );

    match settings.provider.to_lowercase().as_str() {
        "openai" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            let mut provider = OpenAiProvider::new(key, &settings.model, settings.dimensions);
            if let Some(endpoint) = settings.endpoint.as_deref() {
                provider = provider.with_base_url(endpoint);
            }
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let mut provider = OllamaProvider::new(&settings.model, settings.dimensions);
            if let Some(endpoint) = settings.endpoint.as_deref() {
                provider = provider.with_base_url(endpoint);
            }
            Ok(Arc::new(provider))
        }

        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimensions))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, ollama, trigram",
            settings.provider
        ))),
    }
}
