//! API Handlers
//!
//! HTTP request handlers for each prefetch daemon endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    Json,
};

use crate::cache::CacheEntry;
use crate::config::Config;
use crate::error::{PrefetchError, Result};
use crate::metrics::PerfMetrics;
use crate::models::{
    CancelRequest, CancelResponse, ClearResponse, ContainsQuery, ContainsResponse, EnabledRequest,
    HealthResponse, PrefetchRequest, RegisterTargetRequest, StatusResponse, TargetEventRequest,
};
use crate::network::{NetworkMonitor, NetworkSnapshot};
use crate::queue::PrefetchQueue;
use crate::route_config::RouteTable;
use crate::scheduler::{DebugStatus, PrefetchOptions, PrefetchResult, PrefetchScheduler};
use crate::strategy::{Capabilities, RegistrationHandle, StrategyEngine};
use crate::transport::HttpTransport;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Prefetch orchestrator
    pub scheduler: Arc<PrefetchScheduler>,
    /// Per-target trigger machines
    pub engine: StrategyEngine,
    /// Pending-request queue drained by the dispatch task
    pub queue: Arc<PrefetchQueue>,
    /// Live registration handles, keyed by target URL
    targets: Arc<Mutex<HashMap<String, RegistrationHandle>>>,
}

impl AppState {
    /// Creates application state around an existing scheduler.
    pub fn new(scheduler: Arc<PrefetchScheduler>, config: &Config) -> Self {
        let queue = Arc::new(PrefetchQueue::new());
        let engine = StrategyEngine::new(
            queue.clone(),
            scheduler.routes().clone(),
            scheduler.network().clone(),
            config.timing.clone(),
            Capabilities::default(),
            config.limits.min_downlink_mbps,
        );
        Self {
            scheduler,
            engine,
            queue,
            targets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates application state from configuration, with the real HTTP
    /// warming transport and the declared route table.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let routes = match &config.routes_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                RouteTable::from_json(&json)?
            }
            None => RouteTable::default(),
        };
        let scheduler = Arc::new(PrefetchScheduler::from_config(
            config,
            routes,
            NetworkMonitor::new(),
            Arc::new(HttpTransport::new()),
        )?);
        Ok(Self::new(scheduler, config))
    }
}

/// Handler for POST /prefetch
///
/// Manually triggers a prefetch and returns its structured result. The
/// result is always 200: failed prefetches are data, not HTTP errors.
pub async fn prefetch_handler(
    State(state): State<AppState>,
    Json(req): Json<PrefetchRequest>,
) -> Result<Json<PrefetchResult>> {
    if let Some(error_msg) = req.validate() {
        return Err(PrefetchError::InvalidRequest(error_msg));
    }

    let options = PrefetchOptions {
        force: req.force,
        high_priority: req.high_priority,
        ..PrefetchOptions::default()
    };
    let result = state.scheduler.prefetch(&req.url, options).await;
    Ok(Json(result))
}

/// Handler for POST /cancel
///
/// Best-effort cancellation of an in-flight prefetch.
pub async fn cancel_handler(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Json<CancelResponse> {
    let cancelled = state.scheduler.cancel(&req.url);
    Json(CancelResponse {
        url: req.url,
        cancelled,
    })
}

/// Handler for GET /cache
///
/// Returns a snapshot of all cache entries.
pub async fn cache_entries_handler(State(state): State<AppState>) -> Json<Vec<CacheEntry>> {
    Json(state.scheduler.cache_entries().await)
}

/// Handler for GET /cache/contains?url=...
pub async fn cache_contains_handler(
    State(state): State<AppState>,
    Query(query): Query<ContainsQuery>,
) -> Json<ContainsResponse> {
    let cached = state.scheduler.is_cached(&query.url).await;
    Json(ContainsResponse {
        url: query.url,
        cached,
    })
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.scheduler.clear_cache().await;
    Json(ClearResponse::new(removed))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<PerfMetrics> {
    Json(state.scheduler.metrics().await)
}

/// Handler for POST /metrics/reset
pub async fn reset_metrics_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    state.scheduler.reset_metrics().await;
    Json(StatusResponse::new("Metrics reset"))
}

/// Handler for PUT /enabled
pub async fn enabled_handler(
    State(state): State<AppState>,
    Json(req): Json<EnabledRequest>,
) -> Json<StatusResponse> {
    state.scheduler.set_enabled(req.enabled);
    let message = if req.enabled {
        "Prefetching enabled"
    } else {
        "Prefetching disabled"
    };
    Json(StatusResponse::new(message))
}

/// Handler for POST /network
///
/// The host pushes network condition samples here; the monitor replaces its
/// snapshot wholesale and notifies subscribers.
pub async fn network_update_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<NetworkSnapshot>,
) -> Json<StatusResponse> {
    state.scheduler.network().update(snapshot);
    Json(StatusResponse::new("Network conditions updated"))
}

/// Handler for DELETE /network
///
/// Marks the network-information capability as absent.
pub async fn network_clear_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    state.scheduler.network().clear();
    Json(StatusResponse::new("Network capability cleared"))
}

/// Handler for POST /targets
///
/// Registers a target under its declared strategy. Re-registering a URL
/// releases the previous registration first.
pub async fn register_target_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterTargetRequest>,
) -> Result<Json<StatusResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(PrefetchError::InvalidRequest(error_msg));
    }

    // Release any previous handle before re-registering; dropping it after
    // the new insert would tear down the fresh record under the same key.
    let previous = state.targets.lock().unwrap().remove(&req.url);
    if let Some(handle) = previous {
        handle.unregister();
    }

    let handle = state.engine.register(&req.url);
    state.targets.lock().unwrap().insert(req.url.clone(), handle);
    Ok(Json(StatusResponse::new(format!(
        "Target '{}' registered",
        req.url
    ))))
}

/// Handler for POST /targets/unregister
pub async fn unregister_target_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterTargetRequest>,
) -> Json<StatusResponse> {
    let handle = state.targets.lock().unwrap().remove(&req.url);
    let message = match handle {
        Some(handle) => {
            handle.unregister();
            format!("Target '{}' unregistered", req.url)
        }
        None => format!("Target '{}' was not registered", req.url),
    };
    Json(StatusResponse::new(message))
}

/// Handler for POST /targets/event
///
/// Feeds a host interaction event into the target's strategy machine.
/// Events for unknown targets are accepted and ignored.
pub async fn target_event_handler(
    State(state): State<AppState>,
    Json(req): Json<TargetEventRequest>,
) -> Json<StatusResponse> {
    state.engine.handle_event(&req.url, req.event);
    Json(StatusResponse::new("Event accepted"))
}

/// Handler for GET /debug
///
/// Read-only snapshot of live internals.
pub async fn debug_handler(State(state): State<AppState>) -> Json<DebugStatus> {
    Json(state.scheduler.debug_status().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
