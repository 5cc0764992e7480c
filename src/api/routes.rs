//! API Routes
//!
//! Configures the Axum router with all prefetch daemon endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_contains_handler, cache_entries_handler, cancel_handler, clear_cache_handler,
    debug_handler, enabled_handler, health_handler, metrics_handler, network_clear_handler,
    network_update_handler, prefetch_handler, register_target_handler, reset_metrics_handler,
    target_event_handler, unregister_target_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /prefetch` - Manually trigger a prefetch
/// - `POST /cancel` - Cancel an in-flight prefetch
/// - `GET /cache` - List cache entries
/// - `GET /cache/contains?url=` - Check for a fresh entry
/// - `DELETE /cache` - Clear the cache
/// - `GET /metrics` - Read the performance aggregate
/// - `POST /metrics/reset` - Zero the aggregate
/// - `PUT /enabled` - Toggle prefetching
/// - `POST /network` / `DELETE /network` - Push or clear network conditions
/// - `POST /targets` / `POST /targets/unregister` - Target registration
/// - `POST /targets/event` - Feed a target interaction event
/// - `GET /debug` - Read-only internals snapshot
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/prefetch", post(prefetch_handler))
        .route("/cancel", post(cancel_handler))
        .route("/cache", get(cache_entries_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/contains", get(cache_contains_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/reset", post(reset_metrics_handler))
        .route("/enabled", put(enabled_handler))
        .route("/network", post(network_update_handler))
        .route("/network", delete(network_clear_handler))
        .route("/targets", post(register_target_handler))
        .route("/targets/unregister", post(unregister_target_handler))
        .route("/targets/event", post(target_event_handler))
        .route("/debug", get(debug_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
