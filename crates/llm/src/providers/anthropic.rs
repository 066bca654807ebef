//! Anthropic Messages API provider.
//!
//! Anthropic API: https://docs.anthropic.com/en/api/messages

use crate::client::{ChatMessage, ChatRole, CompletionRequest, CompletionResponse, LlmClient, TokenUsage};
use crate::types::SystemRoleMapping;
use callsight_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const SERVICE: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic chat client.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    role_mapping: SystemRoleMapping,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.anthropic.com", api_key)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            role_mapping: SystemRoleMapping::AsUser,
            client: reqwest::Client::new(),
        }
    }

    /// Override how system messages are sent.
    pub fn with_role_mapping(mut self, role_mapping: SystemRoleMapping) -> Self {
        self.role_mapping = role_mapping;
        self
    }

    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let adapted = self.role_mapping.apply(&request.messages);

        // The messages list only accepts user and assistant turns.
        let (system, messages) = match adapted.system {
            Some(system) => (Some(system), adapted.messages),
            None => {
                let inline: Vec<&str> = adapted
                    .messages
                    .iter()
                    .filter(|m| m.role == ChatRole::System)
                    .map(|m| m.content.as_str())
                    .collect();
                let system = (!inline.is_empty()).then(|| inline.join("\n\n"));
                let rest: Vec<ChatMessage> = adapted
                    .messages
                    .into_iter()
                    .filter(|m| m.role != ChatRole::System)
                    .collect();
                (system, rest)
            }
        };

        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: messages
                .into_iter()
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: m.content,
                })
                .collect(),
            system,
            temperature: request.temperature,
        }
    }

    fn convert_response(
        &self,
        request: &CompletionRequest,
        response: AnthropicResponse,
    ) -> AppResult<CompletionResponse> {
        let content = response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| AppError::malformed(SERVICE, "response has no text content block"))?;

        let usage = response
            .usage
            .ok_or_else(|| AppError::malformed(SERVICE, "response has no usage"))?;

        Ok(CompletionResponse {
            content,
            usage: TokenUsage::new(
                response.model.unwrap_or_else(|| request.model.clone()),
                usage.input_tokens,
                usage.output_tokens,
            ),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        tracing::info!("Sending completion request to Anthropic");

        let body = self.to_anthropic_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(status = status.as_u16(), "Anthropic API error");
            return Err(AppError::upstream(SERVICE, Some(status.as_u16()), error_text));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        let completion = self.convert_response(request, parsed)?;
        tracing::info!(
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Received completion from Anthropic"
        );

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "claude-3-opus-20240229",
            vec![
                ChatMessage::system("You are an analytics assistant."),
                ChatMessage::user("How many calls?"),
            ],
        )
    }

    const OK_BODY: &str = r#"{
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-opus-20240229",
        "content": [{"type": "text", "text": "There were 42 calls."}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 250, "output_tokens": 9}
    }"#;

    #[test]
    fn test_default_mapping_folds_system_into_user() {
        let client = AnthropicClient::new("key");
        let body = client.to_anthropic_request(&request());

        assert!(body.system.is_none());
        assert_eq!(body.max_tokens, 1000);
        assert_eq!(body.messages.len(), 2);
        assert_eq!(
            body.messages[0],
            AnthropicMessage {
                role: "user",
                content: "You are an analytics assistant.".to_string()
            }
        );
    }

    #[test]
    fn test_native_mapping_uses_top_level_system() {
        let client = AnthropicClient::new("key").with_role_mapping(SystemRoleMapping::TopLevel);
        let body = client.to_anthropic_request(&request().with_max_tokens(64));

        assert_eq!(body.system.as_deref(), Some("You are an analytics assistant."));
        assert_eq!(body.max_tokens, 64);
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let client = AnthropicClient::with_base_url(server.url(), "test-key");
        let response = client.complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "There were 42 calls.");
        assert_eq!(response.usage, TokenUsage::new("claude-3-opus-20240229", 250, 9));
    }

    #[tokio::test]
    async fn test_complete_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body(r#"{"type":"error","error":{"type":"api_error"}}"#)
            .create_async()
            .await;

        let client = AnthropicClient::with_base_url(server.url(), "test-key");
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, AppError::Upstream { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_complete_without_text_block_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[],"usage":{"input_tokens":1,"output_tokens":0}}"#)
            .create_async()
            .await;

        let client = AnthropicClient::with_base_url(server.url(), "test-key");
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_complete_without_usage_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"hi"}]}"#)
            .create_async()
            .await;

        let client = AnthropicClient::with_base_url(server.url(), "test-key");
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }
}
