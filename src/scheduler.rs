//! Prefetch Scheduler Module
//!
//! The orchestrator behind the `prefetch` operation: validates the target,
//! consults the cache and the admission gate, drives the warming transport,
//! and writes the outcome back to the cache and the metrics collector.
//!
//! `prefetch` always resolves to a [`PrefetchResult`]; no failure mode
//! crosses this boundary as an error. A failed prefetch only means the
//! speculative optimization did not happen — it must never slow down or
//! break the navigation it tried to accelerate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStore, EntryMetadata};
use crate::config::{Config, PrefetchLimits};
use crate::constraints::{Admission, ConstraintEnforcer, LiveState};
use crate::debug::{DebugEvent, DebugSink};
use crate::error::PrefetchError;
use crate::metrics::{MetricsCollector, PerfMetrics};
use crate::network::{NetworkMonitor, NetworkSnapshot};
use crate::route_config::RouteTable;
use crate::strategy::Trigger;
use crate::transport::{FetchPriority, PrefetchTransport};

// == Prefetch Status ==
/// Tagged outcome of a `prefetch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchStatus {
    /// The transport warmed the target
    Success,
    /// A fresh cache entry answered without a new fetch
    Cached,
    /// Validation, admission or transport stopped the attempt
    Error,
}

// == Prefetch Result ==
/// Structured outcome returned by every `prefetch` call.
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchResult {
    /// Canonical target URL (or the raw input when normalization failed)
    pub url: String,
    pub status: PrefetchStatus,
    pub from_cache: bool,
    pub duration_ms: u64,
    /// Present iff `status == Error`
    pub reason: Option<String>,
}

impl PrefetchResult {
    fn cached(url: String) -> Self {
        Self {
            url,
            status: PrefetchStatus::Cached,
            from_cache: true,
            duration_ms: 0,
            reason: None,
        }
    }

    fn success(url: String, duration_ms: u64) -> Self {
        Self {
            url,
            status: PrefetchStatus::Success,
            from_cache: false,
            duration_ms,
            reason: None,
        }
    }

    fn error(url: String, reason: impl Into<String>) -> Self {
        Self {
            url,
            status: PrefetchStatus::Error,
            from_cache: false,
            duration_ms: 0,
            reason: Some(reason.into()),
        }
    }
}

// == Prefetch Options ==
/// Per-call knobs for the `prefetch` operation.
#[derive(Debug, Clone)]
pub struct PrefetchOptions {
    /// Bypass the fresh-cache fast path and re-warm
    pub force: bool,
    /// Request a high transport priority hint
    pub high_priority: bool,
    /// Trigger recorded in cache metadata
    pub trigger: Trigger,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            force: false,
            high_priority: false,
            trigger: Trigger::Manual,
        }
    }
}

impl PrefetchOptions {
    pub fn triggered_by(trigger: Trigger) -> Self {
        Self {
            trigger,
            ..Self::default()
        }
    }
}

// == Debug Status ==
/// Read-only introspection snapshot for the debug surface.
#[derive(Debug, Clone, Serialize)]
pub struct DebugStatus {
    pub enabled: bool,
    pub in_flight: usize,
    pub cached_entries: usize,
    /// Estimated, not measured (see cache size-estimation notes)
    pub estimated_memory_bytes: u64,
    pub network: Option<NetworkSnapshot>,
    pub limits: PrefetchLimits,
}

// == Scheduler ==
/// Shared prefetch orchestrator. Cheap to clone behind an `Arc`; all
/// mutable state lives in interior locks that are never held across an
/// await point.
pub struct PrefetchScheduler {
    origin: Url,
    default_ttl_ms: u64,
    cache: Arc<RwLock<CacheStore>>,
    metrics: Arc<RwLock<MetricsCollector>>,
    network: NetworkMonitor,
    routes: RouteTable,
    enforcer: ConstraintEnforcer,
    transport: Arc<dyn PrefetchTransport>,
    enabled: AtomicBool,
    /// URL -> cancellation handle for every operation currently awaiting
    /// its transport call
    in_flight: Mutex<HashMap<String, oneshot::Sender<()>>>,
    debug_sink: Option<Arc<dyn DebugSink>>,
}

impl PrefetchScheduler {
    // == Constructor ==
    /// Creates a scheduler for `origin`.
    pub fn new(
        origin: Url,
        default_ttl_ms: u64,
        limits: PrefetchLimits,
        routes: RouteTable,
        network: NetworkMonitor,
        transport: Arc<dyn PrefetchTransport>,
    ) -> Self {
        Self {
            origin,
            default_ttl_ms,
            cache: Arc::new(RwLock::new(CacheStore::new())),
            metrics: Arc::new(RwLock::new(MetricsCollector::new())),
            network,
            routes,
            enforcer: ConstraintEnforcer::new(limits),
            transport,
            enabled: AtomicBool::new(true),
            in_flight: Mutex::new(HashMap::new()),
            debug_sink: None,
        }
    }

    /// Builds a scheduler from daemon configuration.
    pub fn from_config(
        config: &Config,
        routes: RouteTable,
        network: NetworkMonitor,
        transport: Arc<dyn PrefetchTransport>,
    ) -> anyhow::Result<Self> {
        let origin = Url::parse(&config.origin)?;
        Ok(Self::new(
            origin,
            config.default_ttl_ms,
            config.limits.clone(),
            routes,
            network,
            transport,
        ))
    }

    /// Attaches an injectable debug sink. Builds without introspection
    /// simply never call this.
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    fn emit(&self, event: DebugEvent) {
        if let Some(sink) = &self.debug_sink {
            sink.event(&event);
        }
    }

    // == Prefetch ==
    /// Speculatively warms `url`.
    ///
    /// Always resolves; every failure mode is a result with
    /// `status == Error` and a reason string. The only zero-duration path
    /// is the fresh-cache fast path.
    ///
    /// There is no operation-level timeout: a transport call that never
    /// resolves holds its concurrency slot until [`PrefetchScheduler::cancel`]
    /// fires for the same URL.
    pub async fn prefetch(&self, url: &str, options: PrefetchOptions) -> PrefetchResult {
        let started = Instant::now();

        // 1-2. Normalize and reject external origins
        let target = match self.normalize(url) {
            Ok(target) => target,
            Err(e) => {
                debug!(url, error = %e, "prefetch rejected at validation");
                return PrefetchResult::error(url.to_string(), e.to_string());
            }
        };
        let normalized = target.to_string();
        self.emit(DebugEvent::Requested {
            url: normalized.clone(),
        });

        // 3. Fresh-cache fast path
        if !options.force {
            let now = current_timestamp_ms();
            let hit = {
                let mut cache = self.cache.write().await;
                if cache.is_fresh(&normalized, now) {
                    cache.touch(&normalized, now)
                } else {
                    None
                }
            };
            if let Some(entry) = hit {
                self.metrics
                    .write()
                    .await
                    .record_cache_hit(entry.size_bytes, now);
                self.emit(DebugEvent::CacheHit {
                    url: normalized.clone(),
                });
                return PrefetchResult::cached(normalized);
            }
        }

        // Same-key idempotence: never issue a duplicate underlying fetch
        if self
            .in_flight
            .lock()
            .unwrap()
            .contains_key(&normalized)
        {
            return PrefetchResult::error(normalized, "Prefetch already in flight");
        }

        // 4. Route configuration (declared or hover/medium default)
        let rule = self.routes.resolve(target.path());
        let high_priority = options.high_priority || rule.high_priority;

        // 5. Admission
        let in_flight_len = self.in_flight.lock().unwrap().len();
        let ops_per_minute = {
            let now = current_timestamp_ms();
            self.metrics.read().await.ops_per_minute(now)
        };
        let live = LiveState {
            enabled: self.enabled.load(Ordering::SeqCst),
            in_flight: in_flight_len,
            ops_per_minute,
            network: self.network.snapshot(),
        };
        if let Admission::Denied(reason) = self
            .enforcer
            .check_admission(&rule, &live, &self.cache)
            .await
        {
            debug!(url = %normalized, reason = %reason, "admission denied");
            self.emit(DebugEvent::Denied {
                url: normalized.clone(),
                reason,
            });
            return PrefetchResult::error(normalized, reason.to_string());
        }

        // 6. Execute under a cancellation handle. The slot is registered
        // before the await and released on every exit path below. The key
        // is re-checked here: the admission await points above can admit
        // two calls for the same URL, and only one may reach the transport.
        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.contains_key(&normalized) {
                return PrefetchResult::error(normalized, "Prefetch already in flight");
            }
            in_flight.insert(normalized.clone(), cancel_tx);
        }

        let priority = if high_priority {
            FetchPriority::High
        } else {
            FetchPriority::Auto
        };
        let outcome = tokio::select! {
            result = self.transport.warm(&normalized, priority) => Some(result),
            _ = cancel_rx => None,
        };

        self.in_flight.lock().unwrap().remove(&normalized);
        let duration_ms = started.elapsed().as_millis() as u64;
        let now = current_timestamp_ms();

        match outcome {
            // 7. Success: upsert cache, record metric
            Some(Ok(response)) => {
                let ttl_ms = rule.ttl_ms.unwrap_or(self.default_ttl_ms);
                let entry = CacheEntry::new(
                    normalized.clone(),
                    ttl_ms,
                    response.payload_bytes,
                    EntryMetadata {
                        strategy: rule.strategy,
                        priority: rule.priority,
                        trigger: options.trigger,
                    },
                    now,
                );
                {
                    let mut cache = self.cache.write().await;
                    cache.put(entry);
                    let entries = cache.entries();
                    let mut metrics = self.metrics.write().await;
                    metrics.record_success(duration_ms as f64, now);
                    metrics.observe_cache(&entries);
                }
                info!(url = %normalized, duration_ms, "target warmed");
                self.emit(DebugEvent::Warmed {
                    url: normalized.clone(),
                    duration_ms,
                });
                PrefetchResult::success(normalized, duration_ms)
            }
            // 8. Transport failure: record metric, surface the message
            Some(Err(e)) => {
                self.metrics.write().await.record_failure(now);
                warn!(url = %normalized, error = %e, "warm failed");
                let reason = e.to_string();
                self.emit(DebugEvent::Failed {
                    url: normalized.clone(),
                    reason: reason.clone(),
                });
                PrefetchResult::error(normalized, reason)
            }
            // Cancelled while awaiting the transport
            None => {
                self.metrics.write().await.record_failure(now);
                self.emit(DebugEvent::Cancelled {
                    url: normalized.clone(),
                });
                PrefetchResult::error(normalized, PrefetchError::Cancelled.to_string())
            }
        }
    }

    // == Cancel ==
    /// Best-effort cancellation of an in-flight prefetch. Unknown keys and
    /// already-completed operations are no-ops, not errors.
    pub fn cancel(&self, url: &str) -> bool {
        let Ok(target) = self.normalize(url) else {
            return false;
        };
        let normalized = target.to_string();
        let sender = self.in_flight.lock().unwrap().remove(&normalized);
        match sender {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    // == Normalization ==
    /// Resolves `input` against the configured origin into a canonical
    /// absolute URL, rejecting malformed input and external origins.
    fn normalize(&self, input: &str) -> Result<Url, PrefetchError> {
        let parsed = Url::options()
            .base_url(Some(&self.origin))
            .parse(input)
            .map_err(|_| PrefetchError::InvalidUrl)?;

        if parsed.origin() != self.origin.origin() {
            return Err(PrefetchError::ExternalUrl);
        }
        Ok(parsed)
    }

    // == Cache Read-Outs ==
    /// True iff a fresh entry exists for `url`.
    pub async fn is_cached(&self, url: &str) -> bool {
        let Ok(target) = self.normalize(url) else {
            return false;
        };
        let now = current_timestamp_ms();
        self.cache.read().await.is_fresh(&target.to_string(), now)
    }

    /// Snapshot of all cache entries.
    pub async fn cache_entries(&self) -> Vec<CacheEntry> {
        self.cache.read().await.entries()
    }

    /// Drops every cache entry. Returns the number removed.
    pub async fn clear_cache(&self) -> usize {
        let removed = {
            let mut cache = self.cache.write().await;
            cache.clear()
        };
        self.metrics.write().await.observe_cache(&[]);
        info!(removed, "cache cleared");
        removed
    }

    /// Removes entries whose TTL has elapsed. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let (removed, entries) = {
            let mut cache = self.cache.write().await;
            let removed = cache.sweep_expired(now);
            (removed, cache.entries())
        };
        if removed > 0 {
            self.metrics.write().await.observe_cache(&entries);
        }
        removed
    }

    // == Metrics ==
    /// Defensive copy of the live aggregate.
    pub async fn metrics(&self) -> PerfMetrics {
        self.metrics.read().await.read(current_timestamp_ms())
    }

    /// Zeroes the aggregate.
    pub async fn reset_metrics(&self) {
        self.metrics.write().await.reset(current_timestamp_ms());
    }

    // == Enable Flag ==
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "prefetching toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // == Introspection ==
    /// Number of operations currently awaiting their transport call.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// The network monitor feeding strategy and admission gating.
    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// The declared route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Read-only status snapshot for the debug surface.
    pub async fn debug_status(&self) -> DebugStatus {
        let cache = self.cache.read().await;
        DebugStatus {
            enabled: self.is_enabled(),
            in_flight: self.in_flight_count(),
            cached_entries: cache.len(),
            estimated_memory_bytes: cache.estimated_usage(),
            network: self.network.snapshot(),
            limits: self.enforcer.limits().clone(),
        }
    }
}
