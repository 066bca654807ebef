//! Embedding client for Callsight.
//!
//! Turns text (a record projection or a user question) into a fixed-length
//! vector. Providers never retry; callers decide what a failure means.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
