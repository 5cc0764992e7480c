//! Strategy Engine
//!
//! One small state machine per registered target. Each registration owns an
//! explicit record — resolved rule, attempted flag, at most one pending
//! timer — and the handle returned at registration releases exactly that
//! record. There is no global machine and no implicit timer state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::current_timestamp_ms;
use crate::config::StrategyTiming;
use crate::network::NetworkMonitor;
use crate::queue::{PrefetchQueue, QueueItem};
use crate::route_config::{RouteRule, RouteTable, Strategy};
use crate::strategy::{Capabilities, TargetEvent, Trigger};

// == Registration Record ==
/// Per-target state. Exactly one record exists per registered URL; the
/// record owns the single pending timer allowed per armed cycle.
#[derive(Debug)]
struct Registration {
    rule: RouteRule,
    /// Set when this cycle's prefetch has been issued; duplicate triggers
    /// while set are no-ops
    attempted: bool,
    /// The one active debounce/delay timer, if any
    pending: Option<JoinHandle<()>>,
    /// Last touch-start accepted by the throttle
    last_touch: Option<Instant>,
}

impl Registration {
    fn new(rule: RouteRule) -> Self {
        Self {
            rule,
            attempted: false,
            pending: None,
            last_touch: None,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct EngineInner {
    registrations: Mutex<HashMap<String, Registration>>,
    queue: Arc<PrefetchQueue>,
    routes: RouteTable,
    network: NetworkMonitor,
    timing: StrategyTiming,
    capabilities: Capabilities,
    min_downlink_mbps: f64,
}

// == Strategy Engine ==
/// Routes host interaction events into queue pushes according to each
/// target's declared strategy. Cheap to clone; clones share the same
/// registration table.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    inner: Arc<EngineInner>,
}

impl StrategyEngine {
    // == Constructor ==
    pub fn new(
        queue: Arc<PrefetchQueue>,
        routes: RouteTable,
        network: NetworkMonitor,
        timing: StrategyTiming,
        capabilities: Capabilities,
        min_downlink_mbps: f64,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registrations: Mutex::new(HashMap::new()),
                queue,
                routes,
                network,
                timing,
                capabilities,
                min_downlink_mbps,
            }),
        }
    }

    // == Register ==
    /// Registers a target and arms any self-starting strategy (immediate,
    /// idle). The returned handle must be released on target teardown; it
    /// also releases on drop.
    pub fn register(&self, url: &str) -> RegistrationHandle {
        let rule = self.inner.routes.resolve(url);
        let strategy = rule.strategy;
        let delay_override = rule.delay_ms;

        self.inner
            .registrations
            .lock()
            .unwrap()
            .insert(url.to_string(), Registration::new(rule));

        match strategy {
            Strategy::Immediate => {
                let delay = delay_override.unwrap_or(0);
                self.arm_after(url, Duration::from_millis(delay));
            }
            Strategy::Idle => {
                // Idle-callback hosts and fallback hosts share the timeout;
                // the capability only changes which path would be taken.
                if !self.inner.capabilities.idle_callback {
                    debug!(url, "idle callbacks unavailable, using timer fallback");
                }
                let delay = delay_override.unwrap_or(self.inner.timing.idle_timeout_ms);
                self.arm_after(url, Duration::from_millis(delay));
            }
            _ => {}
        }

        RegistrationHandle {
            engine: self.clone(),
            url: url.to_string(),
            released: false,
        }
    }

    // == Handle Event ==
    /// Feeds one host interaction event into the target's machine.
    /// Events for unregistered URLs and duplicate triggers are no-ops.
    pub fn handle_event(&self, url: &str, event: TargetEvent) {
        let strategy = {
            let regs = self.inner.registrations.lock().unwrap();
            match regs.get(url) {
                Some(reg) => reg.rule.strategy,
                None => return,
            }
        };

        match (strategy, event) {
            (Strategy::Hover, TargetEvent::PointerEnter) => {
                let delay = self
                    .delay_override(url)
                    .unwrap_or(self.inner.timing.hover_debounce_ms);
                self.arm_after(url, Duration::from_millis(delay));
            }
            (Strategy::Hover, TargetEvent::PointerLeave) => {
                // Cancels the pending debounce only; a fetch already issued
                // this cycle is not recalled.
                if let Some(reg) = self.inner.registrations.lock().unwrap().get_mut(url) {
                    reg.cancel_pending();
                }
            }
            (Strategy::Viewport, TargetEvent::ViewportEnter { ratio }) => {
                if !self.inner.capabilities.intersection_observer {
                    return;
                }
                if ratio < self.inner.timing.viewport_threshold {
                    return;
                }
                let delay = self
                    .delay_override(url)
                    .unwrap_or(self.inner.timing.viewport_delay_ms);
                self.arm_after(url, Duration::from_millis(delay));
            }
            (Strategy::Viewport, TargetEvent::ViewportExit) => {
                if let Some(reg) = self.inner.registrations.lock().unwrap().get_mut(url) {
                    reg.cancel_pending();
                }
            }
            (Strategy::Touch, TargetEvent::TouchStart) => {
                let throttle = Duration::from_millis(self.inner.timing.touch_throttle_ms);
                {
                    let mut regs = self.inner.registrations.lock().unwrap();
                    let Some(reg) = regs.get_mut(url) else { return };
                    if let Some(last) = reg.last_touch {
                        if last.elapsed() < throttle {
                            return;
                        }
                    }
                    reg.last_touch = Some(Instant::now());
                }
                self.fire(url);
            }
            (Strategy::Prefocus, TargetEvent::Focus) => {
                self.fire(url);
            }
            // Everything else is not a trigger for the target's strategy
            _ => {}
        }
    }

    // == Unregister ==
    /// Removes a target's record and aborts its pending timer. Unknown URLs
    /// are a no-op.
    pub fn unregister(&self, url: &str) {
        if let Some(mut reg) = self.inner.registrations.lock().unwrap().remove(url) {
            reg.cancel_pending();
        }
    }

    /// Number of registered targets.
    pub fn registered_count(&self) -> usize {
        self.inner.registrations.lock().unwrap().len()
    }

    fn delay_override(&self, url: &str) -> Option<u64> {
        self.inner
            .registrations
            .lock()
            .unwrap()
            .get(url)
            .and_then(|reg| reg.rule.delay_ms)
    }

    /// Replaces the target's pending timer with one firing after `delay`.
    fn arm_after(&self, url: &str, delay: Duration) {
        let mut regs = self.inner.registrations.lock().unwrap();
        let Some(reg) = regs.get_mut(url) else { return };
        if reg.attempted {
            return;
        }
        reg.cancel_pending();

        let engine = self.clone();
        let owned = url.to_string();
        reg.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire(&owned);
        }));
    }

    /// Issues the target's one prefetch for this armed cycle, unless it has
    /// already been issued or a bandwidth-sensitive rule hits a slow
    /// connection (in which case the cycle stays armed for a later trigger).
    fn fire(&self, url: &str) {
        let item = {
            let mut regs = self.inner.registrations.lock().unwrap();
            let Some(reg) = regs.get_mut(url) else { return };
            if reg.attempted {
                return;
            }
            if reg.rule.fast_connection_only
                && !self.inner.network.is_fast(self.inner.min_downlink_mbps)
            {
                debug!(url, "skipping trigger on slow connection");
                return;
            }
            reg.attempted = true;
            reg.pending = None;
            QueueItem::new(
                url.to_string(),
                reg.rule.clone(),
                trigger_for(reg.rule.strategy),
                current_timestamp_ms(),
            )
        };
        self.inner.queue.push(item);
    }
}

/// Trigger recorded for an issue by each strategy.
fn trigger_for(strategy: Strategy) -> Trigger {
    match strategy {
        Strategy::Immediate => Trigger::Registration,
        Strategy::Hover => Trigger::PointerEnter,
        Strategy::Viewport => Trigger::ViewportEnter,
        Strategy::Idle => Trigger::IdleTick,
        Strategy::Touch => Trigger::TouchStart,
        Strategy::Prefocus => Trigger::FocusIn,
        Strategy::Manual => Trigger::Manual,
    }
}

// == Registration Handle ==
/// Scoped release for one target registration. `unregister` (or drop)
/// removes the record and aborts its pending timer.
pub struct RegistrationHandle {
    engine: StrategyEngine,
    url: String,
    released: bool,
}

impl RegistrationHandle {
    /// The registered target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Explicitly releases the registration.
    pub fn unregister(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.unregister(&self.url);
        }
    }
}

impl Drop for RegistrationHandle {
    fn drop(&mut self) {
        self.release();
    }
}
