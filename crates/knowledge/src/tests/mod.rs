//! Cross-module tests for the retrieval pipeline.

mod ingest_pipeline;
mod retrieval_ranking;
mod support;
