//! HTTP chat surface.
//!
//! Exposes the chat orchestrator and the ingestion job over axum.

pub mod handlers;
pub mod routing;
pub mod server;
pub mod types;


use callsight_knowledge::{ChatOrchestrator, IngestionJob, RecordStore};
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub ingestion: Arc<IngestionJob>,
    pub records: Arc<dyn RecordStore>,
}

pub use server::start_server;
