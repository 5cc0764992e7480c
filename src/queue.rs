//! Prefetch Queue Module
//!
//! Priority-ordered holding area for prefetch requests between a strategy
//! deciding to issue and the dispatcher executing.
//!
//! Scores include an age bonus, so they are recomputed from scratch before
//! every ordering decision; a score cached at enqueue time would go stale
//! within a second.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::route_config::RouteRule;
use crate::strategy::Trigger;

/// Score subtracted per retry attempt.
const RETRY_PENALTY: f64 = 10.0;

// == Queue Item ==
/// A pending prefetch request before execution.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Target URL as requested (normalized later by the scheduler)
    pub url: String,
    /// Resolved route configuration
    pub rule: RouteRule,
    /// When the item entered the queue (Unix milliseconds)
    pub queue_time: u64,
    /// How many times this request has been re-queued after failure
    pub retry_count: u32,
    /// Trigger that produced the request
    pub trigger: Trigger,
}

impl QueueItem {
    pub fn new(url: String, rule: RouteRule, trigger: Trigger, now: u64) -> Self {
        Self {
            url,
            rule,
            queue_time: now,
            retry_count: 0,
            trigger,
        }
    }

    /// Copy of this item with one more retry on the clock, re-stamped at
    /// `now`.
    pub fn retried(&self, now: u64) -> Self {
        Self {
            url: self.url.clone(),
            rule: self.rule.clone(),
            queue_time: now,
            retry_count: self.retry_count + 1,
            trigger: self.trigger,
        }
    }
}

// == Priority Score ==
/// Effective ordering score of an item at `now`.
///
/// Base score by priority (critical 100, high 75, medium 50, low 25), plus
/// one point per second spent queued, minus 10 per retry, floored at zero.
/// Pure in (priority, queue_time, retry_count) and the supplied clock.
pub fn priority_score(item: &QueueItem, now: u64) -> f64 {
    let age_secs = now.saturating_sub(item.queue_time) as f64 / 1000.0;
    let score = item.rule.priority.base_score() + age_secs - RETRY_PENALTY * item.retry_count as f64;
    score.max(0.0)
}

// == Sort ==
/// Orders items best-first by their recomputed score at `now`.
pub fn sort_prefetch_queue(items: &mut [QueueItem], now: u64) {
    items.sort_by(|a, b| {
        priority_score(b, now)
            .partial_cmp(&priority_score(a, now))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// == Prefetch Queue ==
/// Shared pending-request queue. Pushes wake the dispatcher through the
/// notify handle; pops always take the highest current score.
#[derive(Debug, Default)]
pub struct PrefetchQueue {
    items: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
}

impl PrefetchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Enqueues a request and wakes the dispatcher. A URL already pending is
    /// not enqueued twice; the earlier item keeps its (older, higher-scoring)
    /// queue time.
    pub fn push(&self, item: QueueItem) -> bool {
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|existing| existing.url == item.url) {
            return false;
        }
        items.push_back(item);
        drop(items);
        self.notify.notify_one();
        true
    }

    // == Pop Highest ==
    /// Removes and returns the best-scoring item at `now`.
    pub fn pop_highest(&self, now: u64) -> Option<QueueItem> {
        let mut items = self.items.lock().unwrap();
        let best = items
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                priority_score(a, now)
                    .partial_cmp(&priority_score(b, now))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx)?;
        items.remove(best)
    }

    /// Waits until at least one push has happened since the last wakeup.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Drops all pending items.
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}
