//! Ollama chat provider.
//!
//! Talks to a local Ollama runtime over `/api/chat` with streaming disabled.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, TokenUsage};
use crate::types::SystemRoleMapping;
use callsight_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const SERVICE: &str = "ollama";

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama chat response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// How system messages reach the model
    role_mapping: SystemRoleMapping,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            role_mapping: SystemRoleMapping::Inline,
            client: reqwest::Client::new(),
        }
    }

    /// Override how system messages are sent.
    pub fn with_role_mapping(mut self, role_mapping: SystemRoleMapping) -> Self {
        self.role_mapping = role_mapping;
        self
    }

    fn to_ollama_request(&self, request: &CompletionRequest) -> OllamaChatRequest {
        let adapted = self.role_mapping.apply(&request.messages);

        // Ollama has no top-level system field; put it back at the front.
        let mut messages = Vec::with_capacity(adapted.messages.len() + 1);
        if let Some(system) = adapted.system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(adapted.messages);

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            options,
        }
    }

    fn convert_response(
        &self,
        request: &CompletionRequest,
        response: OllamaChatResponse,
    ) -> AppResult<CompletionResponse> {
        let content = response
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| AppError::malformed(SERVICE, "response has no message content"))?;

        let usage = TokenUsage::new(
            response.model.unwrap_or_else(|| request.model.clone()),
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        Ok(CompletionResponse { content, usage })
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        tracing::info!("Sending completion request to Ollama");

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::upstream(SERVICE, Some(status.as_u16()), error_text));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        let completion = self.convert_response(request, ollama_response)?;
        tracing::info!(
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Received completion from Ollama"
        );

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "llama3.2",
            vec![ChatMessage::system("Be brief."), ChatMessage::user("Hi")],
        )
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let req = request().with_temperature(0.2).with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&req);
        assert_eq!(ollama_req.model, "llama3.2");
        assert!(!ollama_req.stream);
        assert_eq!(ollama_req.messages[0], ChatMessage::system("Be brief."));
        assert_eq!(
            ollama_req.options,
            Some(OllamaOptions {
                temperature: Some(0.2),
                num_predict: Some(100)
            })
        );
    }

    #[test]
    fn test_as_user_mapping_relabels_system() {
        let client = OllamaClient::new().with_role_mapping(SystemRoleMapping::AsUser);
        let ollama_req = client.to_ollama_request(&request());
        assert_eq!(ollama_req.messages[0], ChatMessage::user("Be brief."));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(
                r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hello"},"done":true,"prompt_eval_count":12,"eval_count":3}"#,
            )
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url());
        let response = client.complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Hello");
        assert_eq!(response.usage, TokenUsage::new("llama3.2", 12, 3));
    }

    #[tokio::test]
    async fn test_complete_missing_message_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"model":"llama3.2","done":true}"#)
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url());
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body(r#"{"error":"model not found"}"#)
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url());
        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(404));
    }
}
