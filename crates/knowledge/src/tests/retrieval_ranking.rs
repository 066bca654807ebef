//! Retrieval ranking with the offline embedder.

use super::support::{call, seeded_store};
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::ingest::IngestionJob;
use crate::vector_index::SimilarityIndex;
use std::sync::Arc;

#[tokio::test]
async fn test_relevant_calls_rank_first() {
    let store = seeded_store(&[
        call(1, 120, "Resolved", "Passport renewal"),
        call(2, 340, "Callback", "Billing dispute"),
        call(3, 95, "Transferred", "Driving licence"),
        call(4, 410, "Callback", "Billing dispute"),
    ]);
    let embedder = Arc::new(TrigramProvider::new(384));

    IngestionJob::new(store.clone(), store.clone(), embedder.clone())
        .run_all()
        .await
        .unwrap();

    let question = embedder.embed("billing dispute callback").await.unwrap();
    let matches = store.query(&question, 0.0, 2).unwrap();

    assert_eq!(matches.len(), 2);
    for m in &matches {
        assert_eq!(m.metadata.category.as_deref(), Some("Billing dispute"));
    }
    assert!(matches[0].similarity >= matches[1].similarity);
}

#[tokio::test]
async fn test_metadata_snapshot_survives_retrieval() {
    let store = seeded_store(&[call(7, 250, "Resolved", "Billing")]);
    let embedder = Arc::new(TrigramProvider::new(64));

    IngestionJob::new(store.clone(), store.clone(), embedder.clone())
        .run()
        .await
        .unwrap();

    let question = embedder.embed("billing resolved").await.unwrap();
    let matches = store.query(&question, 0.0, 10).unwrap();

    assert_eq!(matches.len(), 1);
    let metadata = &matches[0].metadata;
    assert_eq!(metadata.teleq_id, Some(7));
    assert_eq!(metadata.call_time_phone, Some(250));
    assert_eq!(metadata.form_closing.as_deref(), Some("Resolved"));
}

#[tokio::test]
async fn test_unrelated_question_below_threshold() {
    let store = seeded_store(&[call(1, 60, "Resolved", "Billing")]);
    let embedder = Arc::new(TrigramProvider::new(384));

    IngestionJob::new(store.clone(), store.clone(), embedder.clone())
        .run()
        .await
        .unwrap();

    let question = embedder.embed("zebra xylophone quantum").await.unwrap();
    assert!(store.query(&question, 0.9, 10).unwrap().is_empty());
}
