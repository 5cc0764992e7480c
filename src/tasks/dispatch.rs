//! Queue Dispatch Task
//!
//! Drains the prefetch queue in priority order, handing each item to the
//! scheduler. Transport failures are re-queued with a retry penalty up to
//! the configured ceiling; validation and admission rejections are final.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::queue::PrefetchQueue;
use crate::scheduler::{PrefetchOptions, PrefetchScheduler, PrefetchStatus};

/// Spawns the queue dispatcher.
///
/// The task parks on the queue's notify handle and, when woken, pops items
/// best-score-first until the queue is dry. Priority scores are recomputed
/// at every pop, so an item that aged while the dispatcher was busy gets
/// its age bonus.
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it during graceful
/// shutdown.
pub fn spawn_dispatch_task(
    queue: Arc<PrefetchQueue>,
    scheduler: Arc<PrefetchScheduler>,
    max_retries: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting prefetch dispatch task");

        loop {
            queue.wait().await;

            while let Some(item) = queue.pop_highest(current_timestamp_ms()) {
                let options = PrefetchOptions {
                    high_priority: item.rule.high_priority,
                    trigger: item.trigger,
                    ..PrefetchOptions::default()
                };
                let result = scheduler.prefetch(&item.url, options).await;

                match result.status {
                    PrefetchStatus::Success | PrefetchStatus::Cached => {
                        debug!(url = %item.url, status = ?result.status, "dispatched");
                    }
                    PrefetchStatus::Error => {
                        let reason = result.reason.unwrap_or_default();
                        // Only transport failures are worth retrying
                        let transient = reason.starts_with("Transport error");
                        if transient && item.retry_count < max_retries {
                            let retried = item.retried(current_timestamp_ms());
                            debug!(url = %retried.url, retry = retried.retry_count, "re-queued");
                            queue.push(retried);
                        } else {
                            warn!(url = %item.url, %reason, "dropped from queue");
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefetchLimits;
    use crate::network::NetworkMonitor;
    use crate::queue::QueueItem;
    use crate::route_config::{PrefetchPriority, RouteRule, RouteTable};
    use crate::strategy::Trigger;
    use crate::transport::{FailingTransport, InstantTransport, PrefetchTransport};
    use std::time::Duration;
    use url::Url;

    fn scheduler(transport: Arc<dyn PrefetchTransport>) -> Arc<PrefetchScheduler> {
        Arc::new(PrefetchScheduler::new(
            Url::parse("http://localhost:8080").unwrap(),
            300_000,
            PrefetchLimits::default(),
            RouteTable::default(),
            NetworkMonitor::new(),
            transport,
        ))
    }

    fn item(url: &str, priority: PrefetchPriority) -> QueueItem {
        let mut rule = RouteRule::default_for(url);
        rule.priority = priority;
        QueueItem::new(url.to_string(), rule, Trigger::Manual, current_timestamp_ms())
    }

    #[tokio::test]
    async fn test_dispatch_executes_queued_items() {
        let transport = Arc::new(InstantTransport::new());
        let scheduler = scheduler(transport.clone());
        let queue = Arc::new(PrefetchQueue::new());

        let handle = spawn_dispatch_task(queue.clone(), scheduler.clone(), 2);

        queue.push(item("/a", PrefetchPriority::Medium));
        queue.push(item("/b", PrefetchPriority::Critical));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(transport.calls(), 2);
        assert!(scheduler.is_cached("/a").await);
        assert!(scheduler.is_cached("/b").await);
        handle.abort();
    }

    #[tokio::test]
    async fn test_dispatch_retries_transport_failures_up_to_ceiling() {
        let transport = Arc::new(FailingTransport::new("flaky backend"));
        let scheduler = scheduler(transport.clone());
        let queue = Arc::new(PrefetchQueue::new());

        let handle = spawn_dispatch_task(queue.clone(), scheduler, 2);

        queue.push(item("/a", PrefetchPriority::Medium));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Original attempt plus two retries, then dropped
        assert_eq!(transport.calls(), 3);
        assert!(queue.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_dispatch_does_not_retry_admission_rejections() {
        let transport = Arc::new(InstantTransport::new());
        let sched = Arc::new(PrefetchScheduler::new(
            Url::parse("http://localhost:8080").unwrap(),
            300_000,
            PrefetchLimits {
                max_per_minute: 1,
                ..PrefetchLimits::default()
            },
            RouteTable::default(),
            NetworkMonitor::new(),
            transport.clone(),
        ));
        let queue = Arc::new(PrefetchQueue::new());

        let handle = spawn_dispatch_task(queue.clone(), sched, 5);

        queue.push(item("/a", PrefetchPriority::Medium));
        queue.push(item("/b", PrefetchPriority::Medium));
        tokio::time::sleep(Duration::from_millis(150)).await;

        // The second item was rate-limited and dropped, not re-queued
        assert_eq!(transport.calls(), 1);
        assert!(queue.is_empty());
        handle.abort();
    }
}
