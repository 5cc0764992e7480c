//! Route Configuration Module
//!
//! Declarative lookup from a target path to its trigger strategy, priority
//! and options. Purely static from the scheduler's perspective: rules are
//! loaded once (from a JSON file or built in code) and only read afterwards.

use serde::{Deserialize, Serialize};

// == Strategy ==
/// Trigger policy governing when a registered target is prefetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Issue once shortly after registration
    Immediate,
    /// Issue after a pointer-enter debounce
    Hover,
    /// Issue after the target settles in the viewport
    Viewport,
    /// Issue when the host reports idle time
    Idle,
    /// Only issue through an explicit call
    Manual,
    /// Throttled single-shot on touch-start
    Touch,
    /// Single-shot on keyboard focus
    Prefocus,
}

// == Priority ==
/// Relative urgency of a prefetch request, used for queue ordering and the
/// transport priority hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl PrefetchPriority {
    /// Base score used by queue ordering before age and retry adjustments.
    pub fn base_score(&self) -> f64 {
        match self {
            PrefetchPriority::Critical => 100.0,
            PrefetchPriority::High => 75.0,
            PrefetchPriority::Medium => 50.0,
            PrefetchPriority::Low => 25.0,
        }
    }
}

// == Route Rule ==
/// Declared prefetch behavior for one target pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    /// Path pattern: exact (`/pricing`) or prefix wildcard (`/docs/*`)
    pub pattern: String,
    /// Trigger strategy for targets matching this pattern
    pub strategy: Strategy,
    /// Queue priority
    pub priority: PrefetchPriority,
    /// Strategy delay override in milliseconds; the strategy's stock
    /// delay applies when absent
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Request a high transport priority hint
    #[serde(default)]
    pub high_priority: bool,
    /// Only prefetch on connections classified as fast
    #[serde(default)]
    pub fast_connection_only: bool,
    /// Per-route TTL override in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl RouteRule {
    /// The fallback rule applied to undeclared targets: hover trigger at
    /// medium priority with the stock hover debounce.
    pub fn default_for(path: &str) -> Self {
        Self {
            pattern: path.to_string(),
            strategy: Strategy::Hover,
            priority: PrefetchPriority::Medium,
            delay_ms: None,
            high_priority: false,
            fast_connection_only: false,
            ttl_ms: None,
        }
    }
}

// == Route Table ==
/// Ordered set of declared route rules with pattern resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Creates a table from declared rules.
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Parses a table from its JSON representation (an array of rules).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let rules: Vec<RouteRule> = serde_json::from_str(json)?;
        Ok(Self { rules })
    }

    /// Resolves the rule for a target path.
    ///
    /// Exact pattern match wins; otherwise the longest matching `/*` prefix
    /// wildcard; otherwise the hover/medium default.
    pub fn resolve(&self, path: &str) -> RouteRule {
        if let Some(rule) = self.rules.iter().find(|r| r.pattern == path) {
            return rule.clone();
        }

        let mut best: Option<&RouteRule> = None;
        for rule in &self.rules {
            if let Some(prefix) = rule.pattern.strip_suffix("/*") {
                if path.starts_with(prefix) {
                    let better = match best {
                        Some(b) => rule.pattern.len() > b.pattern.len(),
                        None => true,
                    };
                    if better {
                        best = Some(rule);
                    }
                }
            }
        }

        best.cloned().unwrap_or_else(|| RouteRule::default_for(path))
    }

    /// Number of declared rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are declared.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, strategy: Strategy, priority: PrefetchPriority) -> RouteRule {
        RouteRule {
            pattern: pattern.to_string(),
            strategy,
            priority,
            delay_ms: None,
            high_priority: false,
            fast_connection_only: false,
            ttl_ms: None,
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let table = RouteTable::new(vec![
            rule("/pricing", Strategy::Hover, PrefetchPriority::High),
            rule("/docs/*", Strategy::Viewport, PrefetchPriority::Low),
        ]);

        let resolved = table.resolve("/pricing");
        assert_eq!(resolved.strategy, Strategy::Hover);
        assert_eq!(resolved.priority, PrefetchPriority::High);
    }

    #[test]
    fn test_resolve_wildcard_prefix() {
        let table = RouteTable::new(vec![rule("/docs/*", Strategy::Viewport, PrefetchPriority::Low)]);

        let resolved = table.resolve("/docs/getting-started");
        assert_eq!(resolved.strategy, Strategy::Viewport);
    }

    #[test]
    fn test_resolve_longest_wildcard_wins() {
        let table = RouteTable::new(vec![
            rule("/docs/*", Strategy::Viewport, PrefetchPriority::Low),
            rule("/docs/api/*", Strategy::Immediate, PrefetchPriority::Critical),
        ]);

        let resolved = table.resolve("/docs/api/v2");
        assert_eq!(resolved.strategy, Strategy::Immediate);
    }

    #[test]
    fn test_resolve_undeclared_gets_hover_default() {
        let table = RouteTable::default();

        let resolved = table.resolve("/unknown");
        assert_eq!(resolved.strategy, Strategy::Hover);
        assert_eq!(resolved.priority, PrefetchPriority::Medium);
        assert!(resolved.delay_ms.is_none());
    }

    #[test]
    fn test_exact_match_beats_wildcard() {
        let table = RouteTable::new(vec![
            rule("/docs/*", Strategy::Viewport, PrefetchPriority::Low),
            rule("/docs/special", Strategy::Immediate, PrefetchPriority::Critical),
        ]);

        let resolved = table.resolve("/docs/special");
        assert_eq!(resolved.strategy, Strategy::Immediate);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"pattern": "/pricing", "strategy": "hover", "priority": "high", "delay_ms": 50},
            {"pattern": "/app/*", "strategy": "viewport", "priority": "low", "fast_connection_only": true}
        ]"#;

        let table = RouteTable::from_json(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("/pricing").delay_ms, Some(50));
        assert!(table.resolve("/app/settings").fast_connection_only);
    }

    #[test]
    fn test_priority_base_scores() {
        assert_eq!(PrefetchPriority::Critical.base_score(), 100.0);
        assert_eq!(PrefetchPriority::High.base_score(), 75.0);
        assert_eq!(PrefetchPriority::Medium.base_score(), 50.0);
        assert_eq!(PrefetchPriority::Low.base_score(), 25.0);
    }
}
