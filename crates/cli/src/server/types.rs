//! Request and response bodies.

use callsight_core::{AppError, ErrorEnvelope};
use callsight_llm::{ChatMessage, TokenUsage};
use serde::{Deserialize, Serialize};

/// POST /chat request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,

    /// Overrides the built-in system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// POST /chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub generated_text: String,
    pub usage: TokenUsage,
}

/// GET /status response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub status: String,
    pub version: String,
    pub total_records: usize,
    pub embedded_records: usize,
    pub pending_records: usize,
}

/// Error rendered as an [`ErrorEnvelope`] with a status derived from its kind.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::from_error(&self.0)
    }
}
