//! Constraint Enforcement Module
//!
//! Admission-control gate consulted before every prefetch attempt.
//!
//! Checks run in a fixed precedence order and short-circuit on the first
//! failure: the cheap concurrency and rate counters come before the memory
//! check, which may have to command a cache eviction.

use std::fmt;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::cache::CacheStore;
use crate::config::PrefetchLimits;
use crate::network::{is_fast_connection, NetworkSnapshot};
use crate::route_config::RouteRule;

// == Deny Reason ==
/// Why an admission check rejected a prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    Disabled,
    MaxConcurrent,
    RateLimited,
    MemoryLimit,
    SlowConnection,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DenyReason::Disabled => "Prefetching disabled",
            DenyReason::MaxConcurrent => "Max concurrent operations reached",
            DenyReason::RateLimited => "Rate limit exceeded",
            DenyReason::MemoryLimit => "Memory limit exceeded",
            DenyReason::SlowConnection => "Connection too slow",
        };
        write!(f, "{}", msg)
    }
}

// == Admission ==
/// Outcome of an admission check. Rejections are expected and frequent;
/// they are values, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(DenyReason),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

// == Live State ==
/// Snapshot of the mutable state an admission decision depends on,
/// assembled by the scheduler immediately before the check.
#[derive(Debug, Clone)]
pub struct LiveState {
    /// Global enable flag
    pub enabled: bool,
    /// Current size of the in-flight set
    pub in_flight: usize,
    /// Operations within the trailing minute
    pub ops_per_minute: usize,
    /// Current network conditions, if the capability exists
    pub network: Option<NetworkSnapshot>,
}

// == Constraint Enforcer ==
/// Applies the configured ceilings to a prefetch attempt.
#[derive(Debug, Clone)]
pub struct ConstraintEnforcer {
    limits: PrefetchLimits,
}

impl ConstraintEnforcer {
    pub fn new(limits: PrefetchLimits) -> Self {
        Self { limits }
    }

    /// The ceilings this enforcer applies.
    pub fn limits(&self) -> &PrefetchLimits {
        &self.limits
    }

    // == Check Admission ==
    /// Runs the admission checks in precedence order, short-circuiting on
    /// the first failure:
    ///
    /// 1. global enable flag
    /// 2. concurrency ceiling
    /// 3. per-minute rate ceiling
    /// 4. memory ceiling — tries [`CacheStore::evict_to_fit`] first and
    ///    only rejects when eviction freed nothing
    /// 5. network speed gate for `fast_connection_only` routes
    pub async fn check_admission(
        &self,
        rule: &RouteRule,
        live: &LiveState,
        cache: &RwLock<CacheStore>,
    ) -> Admission {
        if !live.enabled {
            return Admission::Denied(DenyReason::Disabled);
        }

        if live.in_flight >= self.limits.max_concurrent {
            return Admission::Denied(DenyReason::MaxConcurrent);
        }

        if live.ops_per_minute >= self.limits.max_per_minute {
            return Admission::Denied(DenyReason::RateLimited);
        }

        let usage = cache.read().await.estimated_usage();
        if usage > self.limits.max_memory_bytes {
            let after = {
                let mut store = cache.write().await;
                store.evict_to_fit(self.limits.max_memory_bytes);
                store.estimated_usage()
            };
            if after == usage {
                return Admission::Denied(DenyReason::MemoryLimit);
            }
        }

        if rule.fast_connection_only
            && !is_fast_connection(live.network.as_ref(), self.limits.min_downlink_mbps)
        {
            return Admission::Denied(DenyReason::SlowConnection);
        }

        Admission::Allowed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, EntryMetadata};
    use crate::network::EffectiveType;
    use crate::route_config::{PrefetchPriority, Strategy};
    use crate::strategy::Trigger;

    fn enforcer() -> ConstraintEnforcer {
        ConstraintEnforcer::new(PrefetchLimits {
            max_concurrent: 3,
            max_per_minute: 60,
            max_memory_bytes: 10_000,
            min_downlink_mbps: 1.5,
        })
    }

    fn rule(fast_only: bool) -> RouteRule {
        let mut rule = RouteRule::default_for("/a");
        rule.fast_connection_only = fast_only;
        rule
    }

    fn live() -> LiveState {
        LiveState {
            enabled: true,
            in_flight: 0,
            ops_per_minute: 0,
            network: None,
        }
    }

    fn cache_entry(url: &str, payload: u64) -> CacheEntry {
        CacheEntry::new(
            url.to_string(),
            60_000,
            payload,
            EntryMetadata {
                strategy: Strategy::Hover,
                priority: PrefetchPriority::Medium,
                trigger: Trigger::PointerEnter,
            },
            0,
        )
    }

    #[tokio::test]
    async fn test_allows_under_all_limits() {
        let cache = RwLock::new(CacheStore::new());
        let admission = enforcer().check_admission(&rule(false), &live(), &cache).await;
        assert!(admission.is_allowed());
    }

    #[tokio::test]
    async fn test_disabled_rejects_first() {
        let cache = RwLock::new(CacheStore::new());
        let state = LiveState {
            enabled: false,
            in_flight: 99, // would also trip the concurrency check
            ..live()
        };

        let admission = enforcer().check_admission(&rule(false), &state, &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::Disabled));
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let cache = RwLock::new(CacheStore::new());
        let state = LiveState {
            in_flight: 3,
            ..live()
        };

        let admission = enforcer().check_admission(&rule(false), &state, &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::MaxConcurrent));
    }

    #[tokio::test]
    async fn test_rate_ceiling() {
        let cache = RwLock::new(CacheStore::new());
        let state = LiveState {
            ops_per_minute: 60,
            ..live()
        };

        let admission = enforcer().check_admission(&rule(false), &state, &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::RateLimited));
    }

    #[tokio::test]
    async fn test_concurrency_checked_before_rate() {
        let cache = RwLock::new(CacheStore::new());
        let state = LiveState {
            in_flight: 3,
            ops_per_minute: 60,
            ..live()
        };

        let admission = enforcer().check_admission(&rule(false), &state, &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::MaxConcurrent));
    }

    #[tokio::test]
    async fn test_memory_pressure_evicts_and_allows() {
        let cache = RwLock::new(CacheStore::new());
        {
            let mut store = cache.write().await;
            let mut a = cache_entry("http://localhost/a", 8_000);
            a.last_access = 0;
            let mut b = cache_entry("http://localhost/b", 8_000);
            b.last_access = 1_000;
            store.put(a);
            store.put(b);
        }

        let admission = enforcer().check_admission(&rule(false), &live(), &cache).await;

        assert!(admission.is_allowed());
        // The older entry was evicted to make room
        let store = cache.read().await;
        assert_eq!(store.len(), 1);
        assert!(store.get("http://localhost/b").is_some());
    }

    #[tokio::test]
    async fn test_memory_limit_rejects_when_nothing_evictable() {
        let cache = RwLock::new(CacheStore::new());
        {
            let mut store = cache.write().await;
            // One oversized entry: eviction keeps it, usage cannot shrink
            store.put(cache_entry("http://localhost/huge", 50_000));
        }

        let admission = enforcer().check_admission(&rule(false), &live(), &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::MemoryLimit));
    }

    #[tokio::test]
    async fn test_slow_connection_gates_sensitive_routes() {
        let cache = RwLock::new(CacheStore::new());
        let state = LiveState {
            network: Some(NetworkSnapshot {
                effective_type: EffectiveType::TwoG,
                downlink_mbps: 0.3,
                rtt_ms: 900,
                save_data: false,
            }),
            ..live()
        };

        let admission = enforcer().check_admission(&rule(true), &state, &cache).await;
        assert_eq!(admission, Admission::Denied(DenyReason::SlowConnection));

        // The same conditions admit a route without the flag
        let admission = enforcer().check_admission(&rule(false), &state, &cache).await;
        assert!(admission.is_allowed());
    }

    #[tokio::test]
    async fn test_absent_network_capability_admits_sensitive_routes() {
        let cache = RwLock::new(CacheStore::new());
        let admission = enforcer().check_admission(&rule(true), &live(), &cache).await;
        assert!(admission.is_allowed());
    }

    #[test]
    fn test_deny_reason_strings() {
        assert_eq!(DenyReason::Disabled.to_string(), "Prefetching disabled");
        assert_eq!(
            DenyReason::MaxConcurrent.to_string(),
            "Max concurrent operations reached"
        );
        assert_eq!(DenyReason::RateLimited.to_string(), "Rate limit exceeded");
        assert_eq!(DenyReason::MemoryLimit.to_string(), "Memory limit exceeded");
        assert_eq!(DenyReason::SlowConnection.to_string(), "Connection too slow");
    }
}
