//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the cache lifecycle properties: sweep
//! correctness, eviction ordering and the eviction floor.

use proptest::prelude::*;

use crate::cache::{CacheEntry, CacheStore, EntryMetadata};
use crate::route_config::{PrefetchPriority, Strategy as RouteStrategy};
use crate::strategy::Trigger;

// == Strategies ==
/// Generates plausible same-origin target paths
fn path_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9/_-]{1,32}".prop_map(|s| format!("http://localhost/{}", s))
}

fn metadata() -> EntryMetadata {
    EntryMetadata {
        strategy: RouteStrategy::Hover,
        priority: PrefetchPriority::Medium,
        trigger: Trigger::PointerEnter,
    }
}

/// Generates an entry with arbitrary creation time, TTL and access time
fn entry_strategy() -> impl Strategy<Value = CacheEntry> {
    (path_strategy(), 0u64..100_000, 1u64..50_000, 0u64..200_000, 0u64..10_000).prop_map(
        |(url, created_at, ttl_ms, last_access, payload)| {
            let mut entry = CacheEntry::new(url, ttl_ms, payload, metadata(), created_at);
            entry.last_access = last_access;
            entry
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any set of entries and any sweep time, the sweep removes exactly
    // the stale entries and leaves exactly the fresh ones.
    #[test]
    fn prop_sweep_removes_exactly_the_stale(
        entries in prop::collection::vec(entry_strategy(), 0..20),
        now in 0u64..200_000,
    ) {
        let mut store = CacheStore::new();
        for entry in entries {
            store.put(entry);
        }
        let fresh_before: Vec<String> = store
            .entries()
            .iter()
            .filter(|e| e.is_fresh(now))
            .map(|e| e.url.clone())
            .collect();
        let total_before = store.len();

        let removed = store.sweep_expired(now);

        prop_assert_eq!(removed, total_before - fresh_before.len());
        prop_assert_eq!(store.len(), fresh_before.len());
        for url in fresh_before {
            prop_assert!(store.get(&url).is_some(), "Fresh entry was swept");
        }
    }

    // For any budget, eviction either fits the budget or is down to its
    // floor of one entry.
    #[test]
    fn prop_eviction_fits_budget_or_hits_floor(
        entries in prop::collection::vec(entry_strategy(), 1..20),
        budget in 0u64..200_000,
    ) {
        let mut store = CacheStore::new();
        for entry in entries {
            store.put(entry);
        }

        let remaining = store.evict_to_fit(budget);

        prop_assert_eq!(remaining, store.len());
        prop_assert!(remaining >= 1, "Eviction emptied a non-empty store");
        prop_assert!(
            store.estimated_usage() <= budget || remaining == 1,
            "Over budget with more than one entry left"
        );
    }

    // Eviction drops strictly least-recently-accessed entries: every
    // survivor was accessed no earlier than every evicted entry.
    #[test]
    fn prop_eviction_prefers_recent_entries(
        entries in prop::collection::vec(entry_strategy(), 1..20),
        budget in 0u64..100_000,
    ) {
        let mut store = CacheStore::new();
        for entry in entries {
            store.put(entry);
        }
        let before = store.entries();

        store.evict_to_fit(budget);

        let kept: Vec<String> = store.entries().iter().map(|e| e.url.clone()).collect();
        let oldest_kept = store.entries().iter().map(|e| e.last_access).min();
        let newest_evicted = before
            .iter()
            .filter(|e| !kept.contains(&e.url))
            .map(|e| e.last_access)
            .max();

        if let (Some(oldest_kept), Some(newest_evicted)) = (oldest_kept, newest_evicted) {
            prop_assert!(
                oldest_kept >= newest_evicted,
                "Evicted an entry more recent than a survivor"
            );
        }
    }

    // Touch bookkeeping: after N touches the counter reads N and
    // last_access reflects the latest touch; plain gets change nothing.
    #[test]
    fn prop_touch_bookkeeping(
        url in path_strategy(),
        touches in prop::collection::vec(1u64..100_000, 0..10),
    ) {
        let mut store = CacheStore::new();
        store.put(CacheEntry::new(url.clone(), 60_000, 0, metadata(), 0));

        for now in &touches {
            store.touch(&url, *now);
        }
        let _ = store.get(&url);

        let entry = store.get(&url).unwrap();
        prop_assert_eq!(entry.access_count, touches.len() as u64);
        if !touches.is_empty() {
            prop_assert_eq!(entry.last_access, *touches.last().unwrap());
        }
    }

    // Freshness is exactly the half-open interval check.
    #[test]
    fn prop_freshness_is_half_open(
        created_at in 0u64..100_000,
        ttl_ms in 1u64..50_000,
        now in 0u64..200_000,
    ) {
        let mut store = CacheStore::new();
        let url = "http://localhost/a".to_string();
        store.put(CacheEntry::new(url.clone(), ttl_ms, 0, metadata(), created_at));

        prop_assert_eq!(store.is_fresh(&url, now), now < created_at + ttl_ms);
    }

    // Estimated usage is the sum of the per-entry estimates of whatever
    // survived the puts: upserts replace, they never double-count.
    #[test]
    fn prop_usage_is_sum_of_estimates(
        entries in prop::collection::vec(entry_strategy(), 0..20),
    ) {
        let mut store = CacheStore::new();
        let mut expected: std::collections::HashMap<String, u64> =
            std::collections::HashMap::new();
        for entry in entries {
            expected.insert(entry.url.clone(), entry.size_bytes);
            store.put(entry);
        }

        prop_assert_eq!(store.estimated_usage(), expected.values().sum::<u64>());
        prop_assert_eq!(store.len(), expected.len());
    }
}
