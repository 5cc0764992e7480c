//! Cache Store Module
//!
//! Keyed store of prefetch results combining HashMap storage with TTL
//! freshness and memory-budgeted LRU eviction.
//!
//! Lookups never fail: absent keys surface as `None`, never as errors.
//! Stale entries are not removed on read; they disappear only through
//! [`CacheStore::sweep_expired`], [`CacheStore::evict_to_fit`] or
//! [`CacheStore::clear`].

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Cache Store ==
/// Prefetch result cache keyed by canonical URL.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// URL-keyed storage
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    // == Get ==
    /// Returns the entry for `url` without touching access bookkeeping.
    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    // == Touch ==
    /// Records a cache hit on `url`: increments the access counter and
    /// refreshes `last_access`. Returns a copy of the updated entry, or
    /// `None` if the key is absent.
    pub fn touch(&mut self, url: &str, now: u64) -> Option<CacheEntry> {
        let entry = self.entries.get_mut(url)?;
        entry.record_hit(now);
        Some(entry.clone())
    }

    // == Put ==
    /// Unconditional upsert. An existing entry for the same URL is replaced
    /// wholesale, resetting its TTL clock and access bookkeeping.
    pub fn put(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.url.clone(), entry);
    }

    // == Is Fresh ==
    /// True iff an entry exists for `url` and `now < created_at + ttl_ms`.
    pub fn is_fresh(&self, url: &str, now: u64) -> bool {
        self.entries
            .get(url)
            .map(|entry| entry.is_fresh(now))
            .unwrap_or(false)
    }

    // == Sweep Expired ==
    /// Removes every entry whose TTL has elapsed at `now`.
    ///
    /// Keys are collected first and removed afterwards, so the map is never
    /// mutated while being iterated.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now))
            .map(|(url, _)| url.clone())
            .collect();

        let count = expired.len();
        for url in expired {
            self.entries.remove(&url);
        }
        count
    }

    // == Evict To Fit ==
    /// Evicts least-recently-accessed entries until the estimated total
    /// footprint is at or below `max_bytes`.
    ///
    /// Always keeps at least one entry, even if that single entry alone
    /// exceeds the budget. A single oversized entry must not wipe the whole
    /// cache.
    ///
    /// # Returns
    /// The number of entries remaining after eviction.
    pub fn evict_to_fit(&mut self, max_bytes: u64) -> usize {
        let mut by_age: Vec<(String, u64, u64)> = self
            .entries
            .values()
            .map(|e| (e.url.clone(), e.last_access, e.size_bytes))
            .collect();
        // Oldest last_access first
        by_age.sort_by_key(|(_, last_access, _)| *last_access);

        let mut total: u64 = by_age.iter().map(|(_, _, size)| size).sum();
        for (url, _, size) in by_age {
            if total <= max_bytes || self.entries.len() <= 1 {
                break;
            }
            self.entries.remove(&url);
            total -= size;
        }

        self.entries.len()
    }

    // == Estimated Usage ==
    /// Sum of per-entry size estimates. An approximation derived from
    /// string lengths and fixed overheads, not a measured byte count.
    pub fn estimated_usage(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    // == Entries ==
    /// Snapshot of all entries (clones; the store keeps exclusive ownership
    /// of the originals).
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.values().cloned().collect()
    }

    // == Remove ==
    /// Removes a single entry. Absent keys are a no-op.
    pub fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        self.entries.remove(url)
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
