//! Error types for the prefetch subsystem
//!
//! Provides unified error handling using thiserror.
//!
//! The scheduler itself never lets an error cross its public boundary —
//! every `prefetch` call resolves to a structured result. This enum covers
//! the HTTP layer and the internal transport/validation paths that feed
//! those results.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Prefetch Error Enum ==
/// Unified error type for the prefetch subsystem.
#[derive(Error, Debug)]
pub enum PrefetchError {
    /// Target URL could not be parsed
    #[error("Invalid URL")]
    InvalidUrl,

    /// Target URL resolves outside the configured origin
    #[error("External URL not supported")]
    ExternalUrl,

    /// Underlying warming transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// In-flight operation was cancelled before completion
    #[error("Prefetch cancelled")]
    Cancelled,

    /// Invalid request data on the HTTP surface
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for PrefetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            PrefetchError::InvalidUrl | PrefetchError::ExternalUrl => StatusCode::BAD_REQUEST,
            PrefetchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PrefetchError::Transport(_) => StatusCode::BAD_GATEWAY,
            PrefetchError::Cancelled => StatusCode::CONFLICT,
            PrefetchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the prefetch subsystem.
pub type Result<T> = std::result::Result<T, PrefetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(PrefetchError::InvalidUrl.to_string(), "Invalid URL");
        assert_eq!(
            PrefetchError::ExternalUrl.to_string(),
            "External URL not supported"
        );
    }

    #[test]
    fn test_transport_error_carries_message() {
        let err = PrefetchError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
