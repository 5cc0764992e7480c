//! Configuration Module
//!
//! Handles loading and managing daemon configuration from environment variables.

use std::env;

use serde::Serialize;

// == Limits ==
/// Resource ceilings consulted by the admission gate.
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchLimits {
    /// Maximum number of concurrent in-flight prefetch operations
    pub max_concurrent: usize,
    /// Maximum prefetch operations per trailing 60-second window
    pub max_per_minute: usize,
    /// Estimated cache memory ceiling in bytes
    pub max_memory_bytes: u64,
    /// Minimum downlink in Mbps for a connection to count as fast
    pub min_downlink_mbps: f64,
}

impl Default for PrefetchLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_per_minute: 60,
            max_memory_bytes: 50 * 1024 * 1024,
            min_downlink_mbps: 1.5,
        }
    }
}

// == Strategy Timing ==
/// Fixed delays applied by the trigger strategies.
#[derive(Debug, Clone)]
pub struct StrategyTiming {
    /// Hover debounce before issuing, in milliseconds
    pub hover_debounce_ms: u64,
    /// Viewport settle delay before issuing, in milliseconds
    pub viewport_delay_ms: u64,
    /// Intersection ratio required to arm a viewport target
    pub viewport_threshold: f64,
    /// Minimum spacing between touch-triggered issues, in milliseconds
    pub touch_throttle_ms: u64,
    /// Idle-callback timeout (and fixed-timer fallback), in milliseconds
    pub idle_timeout_ms: u64,
}

impl Default for StrategyTiming {
    fn default() -> Self {
        Self {
            hover_debounce_ms: 100,
            viewport_delay_ms: 100,
            viewport_threshold: 0.1,
            touch_throttle_ms: 200,
            idle_timeout_ms: 2000,
        }
    }
}

/// Daemon configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin that targets must belong to (scheme + host + port)
    pub origin: String,
    /// Default TTL in milliseconds for cache entries without a route override
    pub default_ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Maximum requeue attempts for a failed queued prefetch
    pub max_retries: u32,
    /// Optional path to a JSON route declaration file
    pub routes_file: Option<String>,
    /// Admission ceilings
    pub limits: PrefetchLimits,
    /// Strategy delays
    pub timing: StrategyTiming,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PREWARM_ORIGIN` - Origin to warm (default: `http://localhost:8080`)
    /// - `DEFAULT_TTL_MS` - Default entry TTL in milliseconds (default: 300000)
    /// - `SERVER_PORT` - HTTP server port (default: 3900)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    /// - `MAX_CONCURRENT` - Concurrent prefetch ceiling (default: 3)
    /// - `MAX_PER_MINUTE` - Per-minute rate ceiling (default: 60)
    /// - `MAX_MEMORY_BYTES` - Cache memory ceiling (default: 52428800)
    /// - `MIN_DOWNLINK_MBPS` - Fast-connection threshold (default: 1.5)
    /// - `MAX_RETRIES` - Queue retry ceiling (default: 2)
    /// - `ROUTES_FILE` - Optional JSON route table path
    pub fn from_env() -> Self {
        Self {
            origin: env::var("PREWARM_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            default_ttl_ms: env_parse("DEFAULT_TTL_MS", 300_000),
            server_port: env_parse("SERVER_PORT", 3900),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL", 30),
            max_retries: env_parse("MAX_RETRIES", 2),
            routes_file: env::var("ROUTES_FILE").ok(),
            limits: PrefetchLimits {
                max_concurrent: env_parse("MAX_CONCURRENT", 3),
                max_per_minute: env_parse("MAX_PER_MINUTE", 60),
                max_memory_bytes: env_parse("MAX_MEMORY_BYTES", 50 * 1024 * 1024),
                min_downlink_mbps: env_parse("MIN_DOWNLINK_MBPS", 1.5),
            },
            timing: StrategyTiming {
                hover_debounce_ms: env_parse("HOVER_DEBOUNCE_MS", 100),
                viewport_delay_ms: env_parse("VIEWPORT_DELAY_MS", 100),
                viewport_threshold: env_parse("VIEWPORT_THRESHOLD", 0.1),
                touch_throttle_ms: env_parse("TOUCH_THROTTLE_MS", 200),
                idle_timeout_ms: env_parse("IDLE_TIMEOUT_MS", 2000),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            default_ttl_ms: 300_000,
            server_port: 3900,
            sweep_interval_secs: 30,
            max_retries: 2,
            routes_file: None,
            limits: PrefetchLimits::default(),
            timing: StrategyTiming::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
