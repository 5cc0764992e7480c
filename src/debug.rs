//! Debug Sink Module
//!
//! Injectable observation hook for live internals. The sink is handed to
//! the scheduler at construction; builds that want no introspection simply
//! pass none.

use tracing::debug;

use crate::constraints::DenyReason;

// == Debug Event ==
/// Notable moments inside the scheduler, in the order they can occur for a
/// single operation.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    /// A prefetch request entered the scheduler
    Requested { url: String },
    /// The fresh-cache fast path answered the request
    CacheHit { url: String },
    /// Admission control rejected the request
    Denied { url: String, reason: DenyReason },
    /// The underlying transport completed
    Warmed { url: String, duration_ms: u64 },
    /// The underlying transport failed
    Failed { url: String, reason: String },
    /// An in-flight operation was cancelled
    Cancelled { url: String },
}

// == Debug Sink ==
/// Receiver for [`DebugEvent`]s.
pub trait DebugSink: Send + Sync {
    fn event(&self, event: &DebugEvent);
}

// == Tracing Sink ==
/// Sink that forwards events to the `tracing` subscriber at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn event(&self, event: &DebugEvent) {
        match event {
            DebugEvent::Requested { url } => debug!(url, "prefetch requested"),
            DebugEvent::CacheHit { url } => debug!(url, "served from cache"),
            DebugEvent::Denied { url, reason } => {
                debug!(url, reason = %reason, "admission denied")
            }
            DebugEvent::Warmed { url, duration_ms } => {
                debug!(url, duration_ms, "target warmed")
            }
            DebugEvent::Failed { url, reason } => debug!(url, reason, "warm failed"),
            DebugEvent::Cancelled { url } => debug!(url, "prefetch cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<String>>,
    }

    impl DebugSink for CapturingSink {
        fn event(&self, event: &DebugEvent) {
            self.events.lock().unwrap().push(format!("{:?}", event));
        }
    }

    #[test]
    fn test_sink_receives_events() {
        let sink = Arc::new(CapturingSink::default());
        let as_trait: Arc<dyn DebugSink> = sink.clone();

        as_trait.event(&DebugEvent::Requested {
            url: "http://localhost/a".to_string(),
        });
        as_trait.event(&DebugEvent::Denied {
            url: "http://localhost/a".to_string(),
            reason: DenyReason::RateLimited,
        });

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].contains("RateLimited"));
    }
}
