//! Axum router configuration for all endpoints

use super::handlers;
use super::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/chat", post(handlers::chat))
        .route("/embeddings/generate", post(handlers::generate_embeddings))
        .with_state(state)
}
