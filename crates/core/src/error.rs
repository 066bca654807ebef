//! Error types for Callsight.
//!
//! This module defines a unified error enum covering configuration, storage,
//! upstream model services, retrieval, and completion failures. Callers that
//! face end users should render [`AppError::user_message`] rather than the
//! `Display` output, which may carry upstream detail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for Callsight.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or empty request; correctable by the user
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External service returned a non-success status or could not be reached
    #[error("{service} request failed{}: {detail}", status_suffix(.status))]
    Upstream {
        service: String,
        status: Option<u16>,
        detail: String,
    },

    /// External service answered, but the payload lacked the expected fields
    #[error("{service} returned a malformed response: {detail}")]
    MalformedResponse { service: String, detail: String },

    /// Embedding or index failure while building retrieval context
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Completion call failed; terminal for the request
    #[error("Completion failed{}: {detail}", status_suffix(.status))]
    CompletionFailed { status: Option<u16>, detail: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record store and similarity index errors
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl AppError {
    /// Build an `Upstream` error for a named service.
    pub fn upstream(service: impl Into<String>, status: Option<u16>, detail: impl Into<String>) -> Self {
        AppError::Upstream {
            service: service.into(),
            status,
            detail: detail.into(),
        }
    }

    /// Build a `MalformedResponse` error for a named service.
    pub fn malformed(service: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::MalformedResponse {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// HTTP status reported by the upstream service, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } | AppError::CompletionFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether a caller retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Upstream { status, .. } | AppError::CompletionFailed { status, .. } => {
                match status {
                    None => true,
                    Some(code) => *code == 429 || *code >= 500,
                }
            }
            AppError::RetrievalUnavailable(_) => true,
            _ => false,
        }
    }

    /// Generic message safe to show to end users.
    ///
    /// Never includes upstream error text.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "The request was invalid. Please check your message and try again.",
            AppError::Upstream { .. } => "An external service is unavailable. Please try again.",
            AppError::MalformedResponse { .. } => "An external service returned an unexpected response. Please try again.",
            AppError::CompletionFailed { .. } => "Failed to get a response. Please try again.",
            _ => "Something went wrong. Please try again.",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Error body returned to chat clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    /// Generic, user-facing message
    pub error: String,

    /// Optional operator detail (upstream status and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    /// Build an envelope from an error.
    ///
    /// The upstream status is preserved in `detail`; upstream text is not.
    pub fn from_error(err: &AppError) -> Self {
        let detail = match err {
            AppError::InvalidInput(msg) => Some(msg.clone()),
            _ => err.upstream_status().map(|code| format!("upstream status {}", code)),
        };

        Self {
            error: err.user_message().to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_includes_status() {
        let err = AppError::upstream("embedding", Some(503), "overloaded");
        assert_eq!(err.to_string(), "embedding request failed (503): overloaded");
    }

    #[test]
    fn test_upstream_and_malformed_are_distinct() {
        let unavailable = AppError::upstream("completion", Some(500), "boom");
        let malformed = AppError::malformed("completion", "missing content");
        assert_ne!(unavailable.user_message(), malformed.user_message());
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::upstream("x", None, "timeout").is_retryable());
        assert!(AppError::upstream("x", Some(502), "bad gateway").is_retryable());
        assert!(!AppError::upstream("x", Some(401), "unauthorized").is_retryable());
        assert!(!AppError::InvalidInput("empty".to_string()).is_retryable());
    }

    #[test]
    fn test_envelope_hides_upstream_text() {
        let err = AppError::CompletionFailed {
            status: Some(500),
            detail: "secret internal trace".to_string(),
        };
        let envelope = ErrorEnvelope::from_error(&err);
        assert_eq!(envelope.error, "Failed to get a response. Please try again.");
        assert_eq!(envelope.detail.as_deref(), Some("upstream status 500"));
        assert!(!serde_json::to_string(&envelope).unwrap().contains("secret"));
    }
}
