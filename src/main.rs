//! Prewarm - a navigation prefetch daemon
//!
//! Speculatively warms same-origin targets ahead of navigation, with TTL
//! caching, LRU eviction and network-aware admission control.

mod api;
mod cache;
mod config;
mod constraints;
mod debug;
mod error;
mod metrics;
mod models;
mod network;
mod queue;
mod route_config;
mod scheduler;
mod strategy;
mod tasks;
mod transport;

use std::net::SocketAddr;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use config::Config;
use tasks::{spawn_dispatch_task, spawn_sweep_task};

/// Main entry point for the prewarm daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the scheduler, strategy engine and queue
/// 4. Start the background expiry sweep and queue dispatch tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prewarm=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting prewarm daemon");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: origin={}, default_ttl={}ms, port={}, max_concurrent={}, max_per_minute={}",
        config.origin,
        config.default_ttl_ms,
        config.server_port,
        config.limits.max_concurrent,
        config.limits.max_per_minute
    );

    // Build scheduler, strategy engine and queue
    let state = AppState::from_config(&config)?;
    info!("Scheduler initialized");

    // Start background tasks
    let sweep_handle = spawn_sweep_task(state.scheduler.clone(), config.sweep_interval_secs);
    let dispatch_handle =
        spawn_dispatch_task(state.queue.clone(), state.scheduler.clone(), config.max_retries);
    info!("Background tasks started");

    // Create router with all endpoints
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![sweep_handle, dispatch_handle]))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful
/// shutdown.
async fn shutdown_signal(task_handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Abort the background tasks
    for handle in task_handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
