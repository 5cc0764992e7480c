//! Cache Entry Module
//!
//! Defines the structure for individual prefetch cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::route_config::{PrefetchPriority, Strategy};
use crate::strategy::Trigger;

/// Fixed per-entry overhead added to the size estimate, in bytes.
///
/// Covers map slot, bookkeeping fields and allocator slack.
pub const ENTRY_OVERHEAD_BYTES: u64 = 512;

// == Entry Metadata ==
/// Free-form provenance attached to a cache entry: which strategy and
/// trigger produced it, and at what priority.
#[derive(Debug, Clone, Serialize)]
pub struct EntryMetadata {
    /// Strategy that scheduled the prefetch
    pub strategy: Strategy,
    /// Resolved priority at issue time
    pub priority: PrefetchPriority,
    /// Trigger that fired the prefetch
    pub trigger: Trigger,
}

// == Cache Entry ==
/// Represents one completed prefetch outcome for a normalized target URL.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    /// Canonical absolute target URL
    pub url: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
    /// Timestamp of the most recent cache hit (Unix milliseconds)
    pub last_access: u64,
    /// Monotonic count of cache hits against this entry
    pub access_count: u64,
    /// Estimated footprint in bytes. This is a deterministic estimate
    /// derived from string lengths, not a measured byte count.
    pub size_bytes: u64,
    /// Provenance of the prefetch that produced this entry
    pub metadata: EntryMetadata,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    ///
    /// # Arguments
    /// * `url` - Canonical absolute target URL
    /// * `ttl_ms` - Time-to-live in milliseconds
    /// * `payload_bytes` - Size reported by the transport, folded into the estimate
    /// * `metadata` - Provenance of the originating prefetch
    /// * `now` - Creation timestamp in Unix milliseconds
    pub fn new(
        url: String,
        ttl_ms: u64,
        payload_bytes: u64,
        metadata: EntryMetadata,
        now: u64,
    ) -> Self {
        let size_bytes = estimate_size(&url, &metadata, payload_bytes);
        Self {
            url,
            created_at: now,
            ttl_ms,
            last_access: now,
            access_count: 0,
            size_bytes,
            metadata,
        }
    }

    // == Is Fresh ==
    /// Checks whether the entry is still fresh at `now`.
    ///
    /// The freshness interval is half-open: an entry with `ttl_ms = 1000`
    /// created at `t0` is fresh at `t0 + 999` and stale at exactly
    /// `t0 + 1000`.
    pub fn is_fresh(&self, now: u64) -> bool {
        now < self.created_at + self.ttl_ms
    }

    // == Record Hit ==
    /// Records a cache hit: bumps the access counter and refreshes
    /// `last_access`. Staleness is not checked here; callers gate on
    /// [`CacheEntry::is_fresh`] first.
    pub fn record_hit(&mut self, now: u64) {
        self.access_count += 1;
        self.last_access = now;
    }

    /// Returns remaining TTL in milliseconds (0 once stale).
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        (self.created_at + self.ttl_ms).saturating_sub(now)
    }
}

// == Size Estimation ==
/// Deterministic footprint estimate for an entry.
///
/// URL length plus serialized metadata length plus a fixed overhead, with
/// the transport-reported payload size on top. String lengths stand in for
/// real heap measurement; the result is an approximation by design.
fn estimate_size(url: &str, metadata: &EntryMetadata, payload_bytes: u64) -> u64 {
    let metadata_len = serde_json::to_string(metadata)
        .map(|s| s.len() as u64)
        .unwrap_or(0);
    url.len() as u64 + metadata_len + ENTRY_OVERHEAD_BYTES + payload_bytes
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
