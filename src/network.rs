//! Network Monitor Module
//!
//! Point-in-time network condition snapshots with change notifications.
//!
//! The monitor holds the latest [`NetworkSnapshot`] behind a watch channel.
//! Snapshots are immutable and replaced wholesale; a consumer that needs
//! current conditions calls [`NetworkMonitor::snapshot`] again rather than
//! holding a payload it was handed earlier. `None` means the host exposes no
//! network-information capability, which every caller treats as "assume
//! fast", not as an error.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Default downlink threshold in Mbps for a connection to count as fast.
pub const DEFAULT_MIN_DOWNLINK_MBPS: f64 = 1.5;

// == Effective Type ==
/// Coarse connection classification reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

// == Network Snapshot ==
/// One sample of network conditions. Never partially mutated; a change in
/// conditions produces a whole new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Coarse connection class
    pub effective_type: EffectiveType,
    /// Downlink estimate in Mbps
    pub downlink_mbps: f64,
    /// Round-trip time estimate in milliseconds
    pub rtt_ms: u64,
    /// User requested reduced data usage
    pub save_data: bool,
}

// == Fast Connection Check ==
/// Classifies a snapshot as fast enough for bandwidth-sensitive prefetching.
///
/// `save_data` wins over every other signal. `slow-2g`/`2g` are never fast.
/// Otherwise the downlink estimate must meet `min_downlink_mbps`. An absent
/// snapshot (no capability) counts as fast: most hosts lack the capability,
/// and restricting them all would disable prefetch everywhere.
pub fn is_fast_connection(snapshot: Option<&NetworkSnapshot>, min_downlink_mbps: f64) -> bool {
    let Some(snap) = snapshot else {
        return true;
    };
    if snap.save_data {
        return false;
    }
    if matches!(snap.effective_type, EffectiveType::Slow2g | EffectiveType::TwoG) {
        return false;
    }
    snap.downlink_mbps >= min_downlink_mbps
}

// == Network Monitor ==
/// Shared holder of the latest network snapshot.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: watch::Sender<Option<NetworkSnapshot>>,
}

impl NetworkMonitor {
    // == Constructor ==
    /// Creates a monitor with no capability reported yet.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Returns the current snapshot, or `None` when the capability is
    /// absent.
    pub fn snapshot(&self) -> Option<NetworkSnapshot> {
        *self.tx.borrow()
    }

    /// Replaces the current snapshot and notifies subscribers.
    pub fn update(&self, snapshot: NetworkSnapshot) {
        let _ = self.tx.send(Some(snapshot));
    }

    /// Marks the capability as absent and notifies subscribers.
    pub fn clear(&self) {
        let _ = self.tx.send(None);
    }

    /// Subscribes to change notifications. Receivers learn *that* conditions
    /// changed and re-snapshot; the notification carries no payload worth
    /// holding onto.
    pub fn subscribe(&self) -> watch::Receiver<Option<NetworkSnapshot>> {
        self.tx.subscribe()
    }

    /// Convenience wrapper over [`is_fast_connection`] using the current
    /// snapshot.
    pub fn is_fast(&self, min_downlink_mbps: f64) -> bool {
        is_fast_connection(self.snapshot().as_ref(), min_downlink_mbps)
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}
