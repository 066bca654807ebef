//! Callsight Core Library
//!
//! This crate provides the foundational utilities shared by every Callsight crate:
//! - Error handling (`AppError`, `AppResult`, `ErrorEnvelope`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorEnvelope};
