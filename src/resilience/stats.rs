//! # Outcome Accounting
//!
//! Lock-free counters for execution outcomes, aggregated globally and
//! per operation key. Feeds the health surface; never consulted for
//! control flow.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Terminal disposition of one resilient execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// First attempt succeeded.
    Success,
    /// Succeeded after retries or a recovery strategy.
    Recovered,
    /// A fallback value was served in place of the real result.
    Partial,
    /// All avenues exhausted; the caller saw an error.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Recovered => "recovered",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable view of accumulated outcome counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorStatsSnapshot {
    pub success: u64,
    pub recovered: u64,
    pub partial: u64,
    pub failed: u64,
    /// Failure counts per operation key, sorted by key.
    pub failures_by_key: Vec<(String, u64)>,
}

/// Global outcome counters plus a per-key failure map.
///
/// Per-key counters only move on [`Outcome::Failed`]; partial results
/// and recoveries are visible in the global counters but do not mark a
/// key as failing.
#[derive(Debug, Default)]
pub struct ErrorStats {
    success: AtomicU64,
    recovered: AtomicU64,
    partial: AtomicU64,
    failed: AtomicU64,
    failures_by_key: DashMap<String, u64>,
}

impl ErrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &str, outcome: Outcome) {
        match outcome {
            Outcome::Success => {
                self.success.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Recovered => {
                self.recovered.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Partial => {
                self.partial.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                *self.failures_by_key.entry(key.to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn failures_for(&self, key: &str) -> u64 {
        self.failures_by_key.get(key).map(|c| *c).unwrap_or(0)
    }

    pub fn snapshot(&self) -> ErrorStatsSnapshot {
        let mut failures_by_key: Vec<(String, u64)> = self
            .failures_by_key
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        failures_by_key.sort_by(|a, b| a.0.cmp(&b.0));

        ErrorStatsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            failures_by_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_outcome_kind() {
        let stats = ErrorStats::new();
        stats.record("catalog.lookup", Outcome::Success);
        stats.record("catalog.lookup", Outcome::Recovered);
        stats.record("catalog.lookup", Outcome::Partial);
        stats.record("catalog.lookup", Outcome::Failed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.recovered, 1);
        assert_eq!(snapshot.partial, 1);
        assert_eq!(snapshot.failed, 1);
    }

    #[test]
    fn only_failed_moves_the_per_key_counter() {
        let stats = ErrorStats::new();
        stats.record("catalog.lookup", Outcome::Success);
        stats.record("catalog.lookup", Outcome::Recovered);
        stats.record("catalog.lookup", Outcome::Partial);
        assert_eq!(stats.failures_for("catalog.lookup"), 0);

        stats.record("catalog.lookup", Outcome::Failed);
        stats.record("catalog.lookup", Outcome::Failed);
        assert_eq!(stats.failures_for("catalog.lookup"), 2);
    }

    #[test]
    fn per_key_counters_are_independent() {
        let stats = ErrorStats::new();
        stats.record("catalog.lookup", Outcome::Failed);
        stats.record("inventory.lookup", Outcome::Failed);
        stats.record("inventory.lookup", Outcome::Failed);

        assert_eq!(stats.failures_for("catalog.lookup"), 1);
        assert_eq!(stats.failures_for("inventory.lookup"), 2);
        assert_eq!(stats.failures_for("unknown.lookup"), 0);
    }

    #[test]
    fn snapshot_sorts_failures_by_key() {
        let stats = ErrorStats::new();
        stats.record("zeta.fetch", Outcome::Failed);
        stats.record("alpha.fetch", Outcome::Failed);

        let snapshot = stats.snapshot();
        let keys: Vec<&str> = snapshot
            .failures_by_key
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["alpha.fetch", "zeta.fetch"]);
    }

    #[test]
    fn outcome_display_matches_wire_names() {
        assert_eq!(Outcome::Success.to_string(), "success");
        assert_eq!(Outcome::Recovered.to_string(), "recovered");
        assert_eq!(Outcome::Partial.to_string(), "partial");
        assert_eq!(Outcome::Failed.to_string(), "failed");
    }
}
