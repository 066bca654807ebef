//! Embedding ingestion job.
//!
//! Finds records without an embedding, embeds a short projection of each and
//! stores it with a metadata snapshot. A failing record is logged and counted;
//! it never aborts the batch.

use crate::embeddings::EmbeddingProvider;
use crate::store::RecordStore;
use crate::types::{CallRecord, IndexOutcome, IngestReport};
use crate::vector_index::SimilarityIndex;
use callsight_core::config::IngestSettings;
use callsight_core::AppResult;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

enum RecordOutcome {
    Inserted,
    AlreadyEmbedded,
    Failed,
}

/// Batch job that keeps the similarity index populated.
pub struct IngestionJob {
    records: Arc<dyn RecordStore>,
    index: Arc<dyn SimilarityIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
}

impl IngestionJob {
    pub fn new(
        records: Arc<dyn RecordStore>,
        index: Arc<dyn SimilarityIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let defaults = IngestSettings::default();
        Self {
            records,
            index,
            embedder,
            batch_size: defaults.batch_size,
            concurrency: defaults.concurrency,
        }
    }

    /// Apply batch size and concurrency from settings (both at least 1).
    pub fn with_settings(mut self, settings: &IngestSettings) -> Self {
        self.batch_size = settings.batch_size.max(1);
        self.concurrency = settings.concurrency.max(1);
        self
    }

    /// Process one batch of at most `batch_size` candidates.
    pub async fn run(&self) -> AppResult<IngestReport> {
        self.run_batches(false).await
    }

    /// Process batches until every candidate has been attempted once.
    pub async fn run_all(&self) -> AppResult<IngestReport> {
        self.run_batches(true).await
    }

    #[instrument(skip(self), fields(provider = self.embedder.provider_name(), batch_size = self.batch_size))]
    async fn run_batches(&self, all: bool) -> AppResult<IngestReport> {
        let start = Instant::now();
        let before = self.records.stats()?;

        let mut report = IngestReport {
            total_records: before.total_records,
            already_embedded: before.embedded_records,
            ..IngestReport::default()
        };

        let mut cursor = None;
        loop {
            let candidates = self
                .records
                .records_without_embeddings(self.batch_size, cursor)?;

            if candidates.is_empty() {
                break;
            }

            cursor = candidates.last().map(|r| r.id);
            tracing::info!("Processing {} call logs", candidates.len());

            let outcomes: Vec<RecordOutcome> = stream::iter(candidates)
                .map(|record| self.process(record))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    RecordOutcome::Inserted => report.newly_processed += 1,
                    RecordOutcome::AlreadyEmbedded => report.already_embedded += 1,
                    RecordOutcome::Failed => report.failed += 1,
                }
            }

            if !all {
                break;
            }
        }

        report.pending = self.records.stats()?.pending();

        tracing::info!(
            total = report.total_records,
            already_embedded = report.already_embedded,
            newly_processed = report.newly_processed,
            failed = report.failed,
            pending = report.pending,
            "Ingestion finished in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    async fn process(&self, record: CallRecord) -> RecordOutcome {
        let text = record.log.projection_text();

        let vector = match self.embedder.embed(&text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(record_id = record.id, "Failed to embed call log: {}", e);
                return RecordOutcome::Failed;
            }
        };

        match self.index.index(record.id, &vector, &record.log.metadata()) {
            Ok(IndexOutcome::Inserted) => {
                tracing::debug!(record_id = record.id, "Embedded call log");
                RecordOutcome::Inserted
            }
            Ok(IndexOutcome::AlreadyExists) => {
                tracing::debug!(record_id = record.id, "Call log embedded concurrently, skipping");
                RecordOutcome::AlreadyEmbedded
            }
            Err(e) => {
                tracing::warn!(record_id = record.id, "Failed to store embedding: {}", e);
                RecordOutcome::Failed
            }
        }
    }
}
