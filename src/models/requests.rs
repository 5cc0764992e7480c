//! Request DTOs for the prefetch daemon API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::strategy::TargetEvent;

/// Request body for the prefetch operation (POST /prefetch)
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchRequest {
    /// Target URL, relative to the configured origin or absolute
    pub url: String,
    /// Bypass the fresh-cache fast path
    #[serde(default)]
    pub force: bool,
    /// Request a high transport priority hint
    #[serde(default)]
    pub high_priority: bool,
}

impl PrefetchRequest {
    /// Validates the request data.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.url.is_empty() {
            return Some("URL cannot be empty".to_string());
        }
        if self.url.len() > 2048 {
            return Some("URL exceeds maximum length of 2048 characters".to_string());
        }
        None
    }
}

/// Request body for cancellation (POST /cancel)
#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    /// Target URL of the in-flight operation
    pub url: String,
}

/// Request body for toggling prefetching (PUT /enabled)
#[derive(Debug, Clone, Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

/// Request body for target registration (POST /targets)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterTargetRequest {
    /// Target path to register under its declared strategy
    pub url: String,
}

impl RegisterTargetRequest {
    pub fn validate(&self) -> Option<String> {
        if self.url.is_empty() {
            return Some("URL cannot be empty".to_string());
        }
        None
    }
}

/// Request body for target interaction events (POST /targets/event)
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEventRequest {
    pub url: String,
    #[serde(flatten)]
    pub event: TargetEvent,
}

/// Query parameters for the cache lookup (GET /cache/contains)
#[derive(Debug, Clone, Deserialize)]
pub struct ContainsQuery {
    pub url: String,
}
