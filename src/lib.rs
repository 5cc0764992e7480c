//! Prewarm - a navigation prefetch scheduler and cache
//!
//! Decides whether, when, and under what resource budget to speculatively
//! warm a navigable target before the user gets there. Combines a
//! priority-ordered scheduler, a TTL+LRU cache with memory-bounded
//! eviction, per-target trigger strategies, network-aware admission control
//! and live performance metrics.

pub mod api;
pub mod cache;
pub mod config;
pub mod constraints;
pub mod debug;
pub mod error;
pub mod metrics;
pub mod models;
pub mod network;
pub mod queue;
pub mod route_config;
pub mod scheduler;
pub mod strategy;
pub mod tasks;
pub mod transport;

pub use api::{create_router, AppState};
pub use config::Config;
pub use scheduler::{PrefetchOptions, PrefetchResult, PrefetchScheduler, PrefetchStatus};
pub use tasks::{spawn_dispatch_task, spawn_sweep_task};
