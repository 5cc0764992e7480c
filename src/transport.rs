//! Warming Transport Module
//!
//! The underlying navigate/prefetch primitive behind the scheduler: given a
//! URL and a priority hint, warm the target without navigating. The trait
//! keeps the scheduler testable; deterministic implementations live next to
//! the real HTTP one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PrefetchError, Result};

// == Fetch Priority ==
/// Transport priority hint derived from the route's `high_priority` flag
/// and the caller's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPriority {
    High,
    Auto,
    Low,
}

// == Warm Response ==
/// What the transport learned while warming a target.
#[derive(Debug, Clone, Copy)]
pub struct WarmResponse {
    /// Size of the fetched payload in bytes
    pub payload_bytes: u64,
}

// == Transport Trait ==
/// Asynchronous warming primitive. Implementations must be safe to call
/// concurrently; the scheduler enforces its own concurrency ceiling above
/// this layer.
#[async_trait]
pub trait PrefetchTransport: Send + Sync {
    /// Warms `url`. A rejection surfaces as an error result on the
    /// scheduler's side; it never propagates further.
    async fn warm(&self, url: &str, priority: FetchPriority) -> Result<WarmResponse>;
}

// == HTTP Transport ==
/// Real transport: an HTTP GET that pulls the target into any intermediary
/// caches. The request is marked as speculative so origins can tell it from
/// a navigation.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrefetchTransport for HttpTransport {
    async fn warm(&self, url: &str, priority: FetchPriority) -> Result<WarmResponse> {
        let mut request = self.client.get(url).header("Sec-Purpose", "prefetch");
        if priority == FetchPriority::High {
            request = request.header("Priority", "u=1");
        }

        let response = request
            .send()
            .await
            .map_err(|e| PrefetchError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| PrefetchError::Transport(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| PrefetchError::Transport(e.to_string()))?;

        Ok(WarmResponse {
            payload_bytes: body.len() as u64,
        })
    }
}

// == Testing Transports ==
/// Transport that always succeeds after an optional artificial delay and
/// records every call. Useful wherever a test needs to count underlying
/// fetches.
#[derive(Debug, Default)]
pub struct InstantTransport {
    delay: Option<Duration>,
    payload_bytes: u64,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl InstantTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed only after `delay`, holding an in-flight slot meanwhile.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Report `bytes` as the warmed payload size.
    pub fn with_payload_bytes(bytes: u64) -> Self {
        Self {
            payload_bytes: bytes,
            ..Self::default()
        }
    }

    /// Number of underlying warm calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs warmed, in call order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrefetchTransport for InstantTransport {
    async fn warm(&self, url: &str, _priority: FetchPriority) -> Result<WarmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(WarmResponse {
            payload_bytes: self.payload_bytes,
        })
    }
}

/// Transport that always fails with a fixed message.
#[derive(Debug)]
pub struct FailingTransport {
    message: String,
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrefetchTransport for FailingTransport {
    async fn warm(&self, _url: &str, _priority: FetchPriority) -> Result<WarmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PrefetchError::Transport(self.message.clone()))
    }
}
