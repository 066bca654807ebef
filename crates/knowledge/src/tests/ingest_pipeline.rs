//! Ingestion runs with failing providers and concurrent writers.

use super::support::{call, seeded_store, FailingEmbedder, RacingIndex, SelectiveEmbedder};
use crate::embeddings::providers::TrigramProvider;
use crate::ingest::IngestionJob;
use crate::store::RecordStore;
use crate::vector_index::SimilarityIndex;
use callsight_core::config::IngestSettings;
use std::sync::Arc;

fn settings(batch_size: usize) -> IngestSettings {
    IngestSettings {
        batch_size,
        concurrency: 3,
    }
}

#[tokio::test]
async fn test_failed_records_do_not_abort_batch() {
    let store = seeded_store(&[
        call(1, 60, "Resolved", "Billing"),
        call(2, 60, "Resolved", "Broken"),
        call(3, 60, "Resolved", "Passport"),
        call(4, 60, "Resolved", "Billing"),
    ]);
    let embedder = Arc::new(SelectiveEmbedder {
        needle: "Category: Broken".to_string(),
        inner: TrigramProvider::new(64),
    });

    let report = IngestionJob::new(store.clone(), store.clone(), embedder)
        .with_settings(&settings(10))
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_records, 4);
    assert_eq!(report.newly_processed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(store.embedded_count().unwrap(), 3);
}

#[tokio::test]
async fn test_run_all_attempts_failures_once() {
    let logs: Vec<_> = (1..=5).map(|i| call(i, 60, "Resolved", "Billing")).collect();
    let store = seeded_store(&logs);

    let report = IngestionJob::new(store.clone(), store.clone(), Arc::new(FailingEmbedder))
        .with_settings(&settings(2))
        .run_all()
        .await
        .unwrap();

    assert_eq!(report.failed, 5);
    assert_eq!(report.newly_processed, 0);
    assert_eq!(report.pending, 5);
}

#[tokio::test]
async fn test_lost_race_counts_as_already_embedded() {
    let store = seeded_store(&[
        call(1, 60, "Resolved", "Billing"),
        call(2, 90, "Callback", "Billing"),
    ]);
    let racing = Arc::new(RacingIndex {
        inner: store.clone(),
    });

    let report = IngestionJob::new(store.clone(), racing, Arc::new(TrigramProvider::new(32)))
        .with_settings(&settings(10))
        .run()
        .await
        .unwrap();

    assert_eq!(report.newly_processed, 0);
    assert_eq!(report.already_embedded, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(store.embedded_count().unwrap(), 2);
}

#[tokio::test]
async fn test_records_added_between_runs_are_picked_up() {
    let store = seeded_store(&[call(1, 60, "Resolved", "Billing")]);
    let job = IngestionJob::new(store.clone(), store.clone(), Arc::new(TrigramProvider::new(32)))
        .with_settings(&settings(10));

    let first = job.run().await.unwrap();
    assert_eq!(first.newly_processed, 1);

    store
        .insert_records(&[call(2, 30, "Resolved", "Passport")])
        .unwrap();

    let second = job.run().await.unwrap();
    assert_eq!(second.total_records, 2);
    assert_eq!(second.already_embedded, 1);
    assert_eq!(second.newly_processed, 1);
    assert_eq!(second.pending, 0);
}
