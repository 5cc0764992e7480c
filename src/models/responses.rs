//! Response DTOs for the prefetch daemon API
//!
//! Defines the structure of outgoing HTTP response bodies. Larger read-outs
//! (prefetch results, metrics, cache entries, debug status) serialize their
//! domain types directly; the DTOs here cover the small acknowledgement
//! shapes.

use serde::Serialize;

/// Generic acknowledgement body
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Human-readable outcome message
    pub message: String,
}

impl StatusResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for cancellation (POST /cancel)
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub url: String,
    /// Whether an in-flight operation was actually cancelled
    pub cancelled: bool,
}

/// Response body for cache clearing (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Cache cleared ({} entries removed)", removed),
            removed,
        }
    }
}

/// Response body for the cache lookup (GET /cache/contains)
#[derive(Debug, Clone, Serialize)]
pub struct ContainsResponse {
    pub url: String,
    pub cached: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
