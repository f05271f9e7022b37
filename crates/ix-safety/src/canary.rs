//! Canary promotion gate: a newly built index
//! is first exposed only to a fraction of matching traffic; once enough
//! canary outcomes have accumulated, the fleet-wide promotion decision is
//! an up/down vote against a success-rate threshold.
//!
//! Scenario S5 fixes the shape: out of 200 canary outcomes, 190
//! improvements promotes; 170 improvements (85%) rolls back. We default
//! the threshold at 90% to land exactly between those two fixtures.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanaryVerdict {
    /// Not enough outcomes recorded yet to decide.
    Pending,
    Promote,
    Rollback,
}

struct Outcomes {
    /// The build-time before-plan cost sampled traffic is measured against.
    /// `None` until `start` registers it; outcomes recorded before that
    /// (unit tests exercising the tracker in isolation) just leave it unset.
    baseline_cost: Option<f64>,
    improvements: u32,
    regressions: u32,
}

pub struct CanaryTracker {
    min_sample: u32,
    success_threshold: f64,
    scopes: Mutex<HashMap<String, Outcomes>>,
}

impl CanaryTracker {
    pub fn new(min_sample: u32, success_threshold: f64) -> Self {
        Self {
            min_sample,
            success_threshold,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Opens canary tracking for `scope_key` at the measured build-time
    /// `baseline_cost`. A no-op if the scope is already tracked.
    pub fn start(&self, scope_key: &str, baseline_cost: f64) {
        let mut scopes = self.scopes.lock();
        scopes.entry(scope_key.to_owned()).or_insert(Outcomes {
            baseline_cost: Some(baseline_cost),
            improvements: 0,
            regressions: 0,
        });
    }

    /// Whether `scope_key` currently has an open canary.
    pub fn is_tracking(&self, scope_key: &str) -> bool {
        self.scopes.lock().contains_key(scope_key)
    }

    /// The baseline cost `start` registered for `scope_key`, if any.
    pub fn baseline_cost(&self, scope_key: &str) -> Option<f64> {
        self.scopes.lock().get(scope_key).and_then(|o| o.baseline_cost)
    }

    pub fn record_outcome(&self, scope_key: &str, improved: bool) {
        let mut scopes = self.scopes.lock();
        let entry = scopes.entry(scope_key.to_owned()).or_insert(Outcomes {
            baseline_cost: None,
            improvements: 0,
            regressions: 0,
        });
        if improved {
            entry.improvements += 1;
        } else {
            entry.regressions += 1;
        }
    }

    pub fn verdict(&self, scope_key: &str) -> CanaryVerdict {
        let scopes = self.scopes.lock();
        let Some(entry) = scopes.get(scope_key) else {
            return CanaryVerdict::Pending;
        };
        let total = entry.improvements + entry.regressions;
        if total < self.min_sample {
            return CanaryVerdict::Pending;
        }
        let rate = entry.improvements as f64 / total as f64;
        if rate >= self.success_threshold {
            CanaryVerdict::Promote
        } else {
            CanaryVerdict::Rollback
        }
    }

    /// Drops bookkeeping for a scope once it has been promoted or rolled
    /// back, so a later rebuild on the same scope starts a fresh canary.
    pub fn reset(&self, scope_key: &str) {
        self.scopes.lock().remove(scope_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_below_minimum_sample_size() {
        let tracker = CanaryTracker::new(200, 0.9);
        for _ in 0..50 {
            tracker.record_outcome("t1:contacts", true);
        }
        assert_eq!(tracker.verdict("t1:contacts"), CanaryVerdict::Pending);
    }

    #[test]
    fn promotes_at_ninety_five_percent_improvement() {
        let tracker = CanaryTracker::new(200, 0.9);
        for _ in 0..190 {
            tracker.record_outcome("t1:contacts", true);
        }
        for _ in 0..10 {
            tracker.record_outcome("t1:contacts", false);
        }
        assert_eq!(tracker.verdict("t1:contacts"), CanaryVerdict::Promote);
    }

    #[test]
    fn rolls_back_at_eighty_five_percent_improvement() {
        let tracker = CanaryTracker::new(200, 0.9);
        for _ in 0..170 {
            tracker.record_outcome("t1:contacts", true);
        }
        for _ in 0..30 {
            tracker.record_outcome("t1:contacts", false);
        }
        assert_eq!(tracker.verdict("t1:contacts"), CanaryVerdict::Rollback);
    }

    #[test]
    fn start_registers_baseline_once() {
        let tracker = CanaryTracker::new(200, 0.9);
        assert!(!tracker.is_tracking("t1:contacts"));
        tracker.start("t1:contacts", 100.0);
        tracker.start("t1:contacts", 999.0);
        assert!(tracker.is_tracking("t1:contacts"));
        assert_eq!(tracker.baseline_cost("t1:contacts"), Some(100.0));
    }

    #[test]
    fn reset_clears_a_scope_for_a_fresh_canary() {
        let tracker = CanaryTracker::new(1, 0.9);
        tracker.record_outcome("t1:contacts", false);
        assert_eq!(tracker.verdict("t1:contacts"), CanaryVerdict::Rollback);
        tracker.reset("t1:contacts");
        assert_eq!(tracker.verdict("t1:contacts"), CanaryVerdict::Pending);
    }
}
