//! Test doubles shared by the pipeline tests.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteStore;
use crate::store::RecordStore;
use crate::types::{CallLog, CallMetadata, CallRecord, IndexOutcome, SimilarityMatch};
use crate::vector_index::SimilarityIndex;
use callsight_core::{AppError, AppResult};
use callsight_llm::{CompletionRequest, CompletionResponse, LlmClient, TokenUsage};
use std::sync::{Arc, Mutex};

/// Returns the same vector for every text.
#[derive(Debug)]
pub struct FixedEmbedder {
    pub vector: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}

/// Fails every call with a 503.
#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimensions(&self) -> usize {
        3
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::upstream("embedding", Some(503), "service unavailable"))
    }
}

/// Fails for texts containing `needle`, trigram vectors otherwise.
#[derive(Debug)]
pub struct SelectiveEmbedder {
    pub needle: String,
    pub inner: TrigramProvider,
}

#[async_trait::async_trait]
impl EmbeddingProvider for SelectiveEmbedder {
    fn provider_name(&self) -> &str {
        "selective"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains(&self.needle)) {
            return Err(AppError::upstream("embedding", Some(500), "rejected input"));
        }
        self.inner.embed_batch(texts).await
    }
}

/// Index whose writes always lose to a concurrent writer.
pub struct RacingIndex {
    pub inner: Arc<SqliteStore>,
}

impl SimilarityIndex for RacingIndex {
    fn query(&self, vector: &[f32], threshold: f32, k: usize) -> AppResult<Vec<SimilarityMatch>> {
        self.inner.query(vector, threshold, k)
    }

    fn index(
        &self,
        record_id: i64,
        vector: &[f32],
        metadata: &CallMetadata,
    ) -> AppResult<IndexOutcome> {
        // The other writer lands first.
        self.inner.index(record_id, vector, metadata)?;
        self.inner.index(record_id, vector, metadata)
    }

    fn embedded_count(&self) -> AppResult<usize> {
        self.inner.embedded_count()
    }
}

type Reply = Box<dyn Fn() -> AppResult<CompletionResponse> + Send + Sync>;

/// Completion client that records every request.
pub struct RecordingLlm {
    requests: Mutex<Vec<CompletionRequest>>,
    reply: Reply,
}

impl RecordingLlm {
    pub fn answering(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(move || {
                Ok(CompletionResponse {
                    content: text.clone(),
                    usage: TokenUsage::new("test-model", 120, 40),
                })
            }),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(move || {
                Err(AppError::upstream("anthropic", Some(status), "internal server error"))
            }),
        })
    }

    pub fn malformed() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(|| Err(AppError::malformed("anthropic", "no text content block"))),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no completion request recorded")
    }

    /// Content of the leading system message of the last request.
    pub fn last_system_message(&self) -> String {
        self.last_request().messages[0].content.clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)()
    }
}

/// In-memory store seeded with `logs`.
pub fn seeded_store(logs: &[CallLog]) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_records(logs).unwrap();
    Arc::new(store)
}

/// Records without embeddings, ascending id.
pub fn pending_records(store: &SqliteStore) -> Vec<CallRecord> {
    store.records_without_embeddings(1000, None).unwrap()
}

/// Embed every record of `store` with the same vector.
pub fn index_all(store: &SqliteStore, vector: &[f32]) {
    for record in pending_records(store) {
        store.index(record.id, vector, &record.log.metadata()).unwrap();
    }
}

pub fn call(teleq_id: i64, duration: i64, closing: &str, category: &str) -> CallLog {
    CallLog {
        teleq_id: Some(teleq_id),
        call_time_phone: Some(duration),
        form_closing: Some(closing.to_string()),
        category: Some(category.to_string()),
        ..CallLog::default()
    }
}
