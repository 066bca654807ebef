//! Call-log knowledge base.
//!
//! Local-first retrieval over call logs using SQLite and embeddings:
//! import records, keep their embeddings current, and answer questions
//! with a context summary of the most similar calls.

pub mod chat;
pub mod context;
pub mod embeddings;
pub mod import;
pub mod index;
pub mod ingest;
pub mod store;
pub mod types;
pub mod usage;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chat::{latest_question, ChatOrchestrator, ChatResponse};
pub use context::{build_context, ContextSummary, NO_MATCHES_CONTEXT};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use import::{import_file, parse_csv_records, parse_records, ImportFormat};
pub use index::SqliteStore;
pub use ingest::IngestionJob;
pub use store::{parse_column_list, resolve_columns, AnalysisConfigStore, RecordStore};
pub use types::{
    CallLog, CallMetadata, CallRecord, Column, IngestReport, SimilarityMatch, StoreStats,
    DEFAULT_COLUMNS,
};
pub use usage::{ModelUsage, UsageLedger};
pub use vector_index::SimilarityIndex;
