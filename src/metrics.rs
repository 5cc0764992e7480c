//! Metrics Module
//!
//! Rolling aggregation of prefetch operation counts, latency and cache
//! behavior for the lifetime of the session.
//!
//! Two windows keep the numbers representative of *recent* behavior rather
//! than all-time behavior: the latency average covers only the most recent
//! 100 timed samples, and ops-per-minute is recomputed from a trailing
//! 60-second timestamp list on every read. Neither is a decaying counter,
//! so neither can drift.

use std::collections::VecDeque;

use serde::Serialize;

use crate::cache::{current_timestamp_ms, CacheEntry};

/// Maximum number of timed samples retained for the latency average.
pub const LATENCY_WINDOW: usize = 100;

/// Width of the ops-per-minute window in milliseconds.
pub const OPS_WINDOW_MS: u64 = 60_000;

// == Perf Metrics ==
/// Point-in-time aggregate handed to readers. Always a defensive copy;
/// mutating it has no effect on the collector.
#[derive(Debug, Clone, Serialize)]
pub struct PerfMetrics {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    /// Cache hits divided by total operations, 0.0 when idle
    pub cache_hit_rate: f64,
    /// Average over the last [`LATENCY_WINDOW`] timed operations, in ms
    pub avg_prefetch_ms: f64,
    /// Estimated cache footprint in bytes (see the cache module's
    /// size-estimation notes; this is not a measured count)
    pub memory_usage_bytes: u64,
    /// Operations whose timestamp falls within the trailing 60 seconds
    pub ops_per_minute: usize,
    /// Transport bytes not re-fetched thanks to cache hits
    pub network_savings_bytes: u64,
    /// When the collector was created or last reset (Unix milliseconds)
    pub last_reset: u64,
}

// == Metrics Collector ==
/// Session-lifetime aggregator mutated by the scheduler and read by anyone.
#[derive(Debug)]
pub struct MetricsCollector {
    total_operations: u64,
    successful_operations: u64,
    failed_operations: u64,
    cache_hits: u64,
    network_savings_bytes: u64,
    memory_usage_bytes: u64,
    /// Most recent timed samples, oldest dropped first
    durations: VecDeque<f64>,
    /// Operation timestamps, pruned to the trailing window
    op_timestamps: Vec<u64>,
    last_reset: u64,
}

impl MetricsCollector {
    // == Constructor ==
    pub fn new() -> Self {
        Self::with_reset_at(current_timestamp_ms())
    }

    /// Creates a collector with an explicit reset timestamp.
    pub fn with_reset_at(now: u64) -> Self {
        Self {
            total_operations: 0,
            successful_operations: 0,
            failed_operations: 0,
            cache_hits: 0,
            network_savings_bytes: 0,
            memory_usage_bytes: 0,
            durations: VecDeque::with_capacity(LATENCY_WINDOW),
            op_timestamps: Vec::new(),
            last_reset: now,
        }
    }

    // == Record Success ==
    /// Records a completed underlying prefetch with its measured duration.
    pub fn record_success(&mut self, duration_ms: f64, now: u64) {
        self.record(true, Some(duration_ms), false, 0, now);
    }

    // == Record Failure ==
    /// Records a failed underlying prefetch.
    pub fn record_failure(&mut self, now: u64) {
        self.record(false, None, false, 0, now);
    }

    // == Record Cache Hit ==
    /// Records an operation served from cache. Cache hits carry no timed
    /// sample; the zero-duration fast path would drag the latency average
    /// toward numbers no transport ever produced.
    pub fn record_cache_hit(&mut self, saved_bytes: u64, now: u64) {
        self.record(true, None, true, saved_bytes, now);
    }

    fn record(
        &mut self,
        success: bool,
        duration_ms: Option<f64>,
        cache_hit: bool,
        saved_bytes: u64,
        now: u64,
    ) {
        self.total_operations += 1;
        if success {
            self.successful_operations += 1;
        } else {
            self.failed_operations += 1;
        }
        if cache_hit {
            self.cache_hits += 1;
            self.network_savings_bytes += saved_bytes;
        }
        if let Some(ms) = duration_ms {
            if self.durations.len() == LATENCY_WINDOW {
                self.durations.pop_front();
            }
            self.durations.push_back(ms);
        }

        self.op_timestamps.push(now);
        self.prune_timestamps(now);
    }

    // == Observe Cache ==
    /// Refreshes the memory-usage figure from a cache snapshot.
    pub fn observe_cache(&mut self, entries: &[CacheEntry]) {
        self.memory_usage_bytes = entries.iter().map(|e| e.size_bytes).sum();
    }

    // == Ops Per Minute ==
    /// Count of operations within the trailing 60-second window ending at
    /// `now`, recomputed from the timestamp list on every call.
    pub fn ops_per_minute(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(OPS_WINDOW_MS);
        self.op_timestamps.iter().filter(|&&t| t > cutoff).count()
    }

    // == Read ==
    /// Produces a defensive copy of the current aggregate at `now`.
    pub fn read(&self, now: u64) -> PerfMetrics {
        let avg_prefetch_ms = if self.durations.is_empty() {
            0.0
        } else {
            self.durations.iter().sum::<f64>() / self.durations.len() as f64
        };
        let cache_hit_rate = if self.total_operations == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_operations as f64
        };

        PerfMetrics {
            total_operations: self.total_operations,
            successful_operations: self.successful_operations,
            failed_operations: self.failed_operations,
            cache_hit_rate,
            avg_prefetch_ms,
            memory_usage_bytes: self.memory_usage_bytes,
            ops_per_minute: self.ops_per_minute(now),
            network_savings_bytes: self.network_savings_bytes,
            last_reset: self.last_reset,
        }
    }

    // == Reset ==
    /// Zeroes every counter and window.
    pub fn reset(&mut self, now: u64) {
        *self = Self::with_reset_at(now);
    }

    fn prune_timestamps(&mut self, now: u64) {
        let cutoff = now.saturating_sub(OPS_WINDOW_MS);
        self.op_timestamps.retain(|&t| t > cutoff);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
