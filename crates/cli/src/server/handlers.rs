//! Endpoint handlers.

use super::types::{ApiError, ChatReply, ChatRequest, StatusReply};
use super::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use callsight_core::AppError;
use callsight_knowledge::{IngestReport, RecordStore};
use callsight_llm::{ChatMessage, ChatRole};
use callsight_prompt::DEFAULT_SYSTEM_PROMPT;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. }
            | AppError::MalformedResponse { .. }
            | AppError::RetrievalUnavailable(_)
            | AppError::CompletionFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::BAD_REQUEST {
            tracing::info!("Rejected request: {}", self.0);
        } else {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self.0);
        }

        (status, Json(self.envelope())).into_response()
    }
}

/// POST /chat - Answer the latest user message with retrieved context
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    let (system_prompt, conversation) = split_system_prompt(request.system_prompt, request.messages);

    let response = state
        .orchestrator
        .converse(&conversation, &system_prompt)
        .await?;

    Ok(Json(ChatReply {
        generated_text: response.text,
        usage: response.usage,
    }))
}

/// POST /embeddings/generate - Run one ingestion batch
pub async fn generate_embeddings(
    State(state): State<AppState>,
) -> Result<Json<IngestReport>, ApiError> {
    let report = state.ingestion.run().await?;
    Ok(Json(report))
}

/// GET /status - Health check with record counts
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusReply>, ApiError> {
    let stats = state.records.stats()?;

    Ok(Json(StatusReply {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        total_records: stats.total_records,
        embedded_records: stats.embedded_records,
        pending_records: stats.pending(),
    }))
}

/// Pick the system prompt for a chat request.
///
/// An explicit prompt wins and the conversation is left as sent; any system
/// messages in it are merged after the prompt by the orchestrator. Otherwise
/// the leading system messages, joined, become the prompt and are removed.
/// With neither, the built-in prompt is used.
fn split_system_prompt(
    explicit: Option<String>,
    messages: Vec<ChatMessage>,
) -> (String, Vec<ChatMessage>) {
    let leading = messages
        .iter()
        .take_while(|m| m.role == ChatRole::System)
        .count();

    if let Some(prompt) = explicit.filter(|p| !p.trim().is_empty()) {
        if leading > 0 {
            tracing::debug!(
                leading,
                "Explicit system prompt given; leading system messages are appended to it"
            );
        }
        return (prompt, messages);
    }

    if leading == 0 {
        return (DEFAULT_SYSTEM_PROMPT.to_string(), messages);
    }

    let prompt = messages[..leading]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    (prompt, messages.into_iter().skip(leading).collect())
}
