//! Completion client factory.
//!
//! Builds the configured backend with its endpoint, key, and system-role
//! mapping applied.

use crate::client::LlmClient;
use crate::providers::{AnthropicClient, OllamaClient};
use crate::types::ProviderType;
use callsight_core::config::CompletionSettings;
use callsight_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a completion client from settings.
///
/// # Arguments
/// * `settings` - Completion section of the application config
/// * `api_key` - Resolved API key (required for Anthropic)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, the key is missing,
/// or `systemRole` is not valid for the backend.
pub fn create_client(
    settings: &CompletionSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown completion provider: {}. Supported: anthropic, ollama",
            settings.provider
        ))
    })?;
    let role_mapping = provider.role_mapping(settings.system_role.as_deref())?;

    tracing::debug!(provider = provider.as_str(), ?role_mapping, "Creating completion client");

    match provider {
        ProviderType::Anthropic => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("Anthropic provider requires an API key".to_string())
            })?;
            let client = match settings.endpoint.as_deref() {
                Some(endpoint) => AnthropicClient::with_base_url(endpoint, key),
                None => AnthropicClient::new(key),
            };
            Ok(Arc::new(client.with_role_mapping(role_mapping)))
        }
        ProviderType::Ollama => {
            let base_url = settings.endpoint.as_deref().unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_base_url(base_url).with_role_mapping(role_mapping);
            Ok(Arc::new(client))
        }
    }
}
