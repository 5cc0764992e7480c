//! Strategy Module
//!
//! Per-target trigger logic deciding *when* a registered target is handed
//! to the scheduler.

mod engine;

pub use engine::{RegistrationHandle, StrategyEngine};

use serde::{Deserialize, Serialize};

// == Trigger ==
/// What actually fired a prefetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Immediate strategy firing at registration
    Registration,
    PointerEnter,
    ViewportEnter,
    IdleTick,
    TouchStart,
    FocusIn,
    /// Explicit call through the public surface
    Manual,
}

// == Target Event ==
/// Host-reported interaction events driving the per-target machines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum TargetEvent {
    PointerEnter,
    PointerLeave,
    ViewportEnter { ratio: f64 },
    ViewportExit,
    TouchStart,
    Focus,
}

// == Capabilities ==
/// Host platform capability flags, probed once at startup and treated as
/// booleans afterwards. Absence degrades behavior gracefully; it is never
/// an error.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Capabilities {
    pub network_information: bool,
    pub intersection_observer: bool,
    pub idle_callback: bool,
    pub prefetch_link_rel: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            network_information: true,
            intersection_observer: true,
            idle_callback: true,
            prefetch_link_rel: true,
        }
    }
}
