//! Chat orchestrator.
//!
//! One request: embed the latest question, retrieve similar call logs,
//! summarize them into the system message, and ask the completion model.
//! Retrieval and column-config failures degrade to less context; only the
//! completion call can fail the request.

use crate::context::build_context;
use crate::embeddings::EmbeddingProvider;
use crate::store::{resolve_columns, AnalysisConfigStore};
use crate::types::{Column, SimilarityMatch};
use crate::vector_index::SimilarityIndex;
use callsight_core::config::{CompletionSettings, RetrievalSettings};
use callsight_core::{AppError, AppResult};
use callsight_llm::{ChatMessage, ChatRole, CompletionRequest, LlmClient, TokenUsage};
use callsight_prompt::append_context;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Generated answer plus accounting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub usage: TokenUsage,
    /// Number of call logs summarized into the context
    pub context_matches: usize,
}

/// Request-level retrieval-augmented chat pipeline.
pub struct ChatOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    analysis_config: Arc<dyn AnalysisConfigStore>,
    completion: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    match_threshold: f32,
    match_count: usize,
}

impl ChatOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        analysis_config: Arc<dyn AnalysisConfigStore>,
        completion: Arc<dyn LlmClient>,
        completion_settings: &CompletionSettings,
    ) -> Self {
        let retrieval = RetrievalSettings::default();
        Self {
            embedder,
            index,
            analysis_config,
            completion,
            model: completion_settings.model.clone(),
            max_tokens: completion_settings.max_tokens,
            match_threshold: retrieval.match_threshold,
            match_count: retrieval.match_count,
        }
    }

    /// Override similarity threshold and match count.
    pub fn with_retrieval(mut self, retrieval: &RetrievalSettings) -> Self {
        self.match_threshold = retrieval.match_threshold;
        self.match_count = retrieval.match_count;
        self
    }

    /// Answer the latest user message in `conversation`.
    ///
    /// # Errors
    /// * `AppError::InvalidInput` - no user message, or it is blank
    /// * `AppError::CompletionFailed` - completion service failed
    /// * `AppError::MalformedResponse` - completion answered without text or usage
    #[instrument(skip_all, fields(messages = conversation.len(), model = %self.model))]
    pub async fn converse(
        &self,
        conversation: &[ChatMessage],
        system_prompt: &str,
    ) -> AppResult<ChatResponse> {
        let question = latest_question(conversation)?;

        let matches = match self.retrieve(&question).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Continuing without retrieved context: {}", e);
                Vec::new()
            }
        };

        let columns = self.selected_columns();
        let context = build_context(&matches, &columns);

        let messages = build_messages(conversation, system_prompt, &context);
        let request = CompletionRequest::new(&self.model, messages).with_max_tokens(self.max_tokens);

        let response = self.completion.complete(&request).await.map_err(|e| {
            tracing::error!(provider = self.completion.provider_name(), "Completion failed: {}", e);
            match e {
                AppError::Upstream { status, detail, .. } => {
                    AppError::CompletionFailed { status, detail }
                }
                AppError::MalformedResponse { .. } | AppError::CompletionFailed { .. } => e,
                other => AppError::CompletionFailed {
                    status: None,
                    detail: other.to_string(),
                },
            }
        })?;

        tracing::info!(
            context_matches = matches.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Chat turn complete"
        );

        Ok(ChatResponse {
            text: response.content,
            usage: response.usage,
            context_matches: matches.len(),
        })
    }

    async fn retrieve(&self, question: &str) -> AppResult<Vec<SimilarityMatch>> {
        let vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| AppError::RetrievalUnavailable(format!("embedding failed: {}", e)))?;

        let matches = self
            .index
            .query(&vector, self.match_threshold, self.match_count)
            .map_err(|e| AppError::RetrievalUnavailable(format!("similarity query failed: {}", e)))?;

        tracing::debug!(
            matches = matches.len(),
            threshold = self.match_threshold,
            k = self.match_count,
            "Retrieved similar call logs"
        );

        Ok(matches)
    }

    fn selected_columns(&self) -> Vec<Column> {
        match self.analysis_config.selected_columns() {
            Ok(stored) => resolve_columns(stored),
            Err(e) => {
                tracing::warn!("Failed to read analysis config, using default columns: {}", e);
                resolve_columns(None)
            }
        }
    }
}

/// Latest user message, newlines collapsed and trimmed.
pub fn latest_question(conversation: &[ChatMessage]) -> AppResult<String> {
    let message = conversation
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .ok_or_else(|| AppError::InvalidInput("conversation has no user message".to_string()))?;

    let question = message
        .content
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if question.is_empty() {
        return Err(AppError::InvalidInput("user message is empty".to_string()));
    }

    Ok(question)
}

/// One system message, then the non-system conversation in order.
///
/// System messages found inside the conversation are merged after the
/// prompt and before the context, so the backend only ever sees one.
fn build_messages(conversation: &[ChatMessage], system_prompt: &str, context: &str) -> Vec<ChatMessage> {
    let (inline_system, turns): (Vec<&ChatMessage>, Vec<&ChatMessage>) = conversation
        .iter()
        .partition(|m| m.role == ChatRole::System);

    let mut prompt = system_prompt.to_string();
    for message in inline_system {
        if message.content.trim().is_empty() {
            continue;
        }
        tracing::debug!("Merging inline system message into the system prompt");
        prompt.push_str("\n\n");
        prompt.push_str(&message.content);
    }

    let mut messages = Vec::with_capacity(turns.len() + 1);
    messages.push(ChatMessage::system(append_context(&prompt, context)));
    messages.extend(turns.into_iter().cloned());
    messages
}
