//! Degradation tracking. The HTTP endpoint itself is out of scope (§1); this is the
//! in-process state it would read.

use std::{
    collections::HashMap,
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::Mutex;

/// Per-component sliding window of failure timestamps. A component is
/// degraded once `threshold` failures fall within `window` of each other;
/// it recovers on its own once old failures age out, with no explicit
/// "clear" call needed.
pub struct DegradationTracker {
    window: Duration,
    threshold: usize,
    failures: Mutex<HashMap<&'static str, Vec<Instant>>>,
}

impl DegradationTracker {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            window,
            threshold: threshold.max(1),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_failure(&self, component: &'static str) {
        let now = Instant::now();
        let mut failures = self.failures.lock();
        let entry = failures.entry(component).or_default();
        entry.push(now);
        entry.retain(|t| now.duration_since(*t) <= self.window);
    }

    /// Clears a component's failure history on a success, so a single
    /// isolated blip does not linger toward the threshold forever.
    pub fn record_success(&self, component: &'static str) {
        self.failures.lock().remove(component);
    }

    pub fn is_degraded(&self, component: &str) -> bool {
        let now = Instant::now();
        let mut failures = self.failures.lock();
        let Some(entry) = failures.get_mut(component) else {
            return false;
        };
        entry.retain(|t| now.duration_since(*t) <= self.window);
        entry.len() >= self.threshold
    }

    /// Every component currently degraded, for the `verify` CLI summary and
    /// the hosting application's health payload.
    pub fn degraded_components(&self) -> Vec<String> {
        let now = Instant::now();
        let mut failures = self.failures.lock();
        failures
            .iter_mut()
            .filter_map(|(name, times)| {
                times.retain(|t| now.duration_since(*t) <= self.window);
                (times.len() >= self.threshold).then(|| (*name).to_owned())
            })
            .collect()
    }

    pub fn any_degraded(&self) -> bool {
        !self.degraded_components().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrades_after_threshold_failures_in_window() {
        let tracker = DegradationTracker::new(Duration::from_secs(60), 3);
        tracker.record_failure("gateway");
        assert!(!tracker.is_degraded("gateway"));
        tracker.record_failure("gateway");
        assert!(!tracker.is_degraded("gateway"));
        tracker.record_failure("gateway");
        assert!(tracker.is_degraded("gateway"));
    }

    #[test]
    fn a_success_clears_the_window() {
        let tracker = DegradationTracker::new(Duration::from_secs(60), 2);
        tracker.record_failure("planner");
        tracker.record_failure("planner");
        assert!(tracker.is_degraded("planner"));
        tracker.record_success("planner");
        assert!(!tracker.is_degraded("planner"));
    }

    #[test]
    fn components_are_tracked_independently() {
        let tracker = DegradationTracker::new(Duration::from_secs(60), 1);
        tracker.record_failure("gateway");
        assert!(tracker.is_degraded("gateway"));
        assert!(!tracker.is_degraded("planner"));
        assert_eq!(tracker.degraded_components(), vec!["gateway".to_owned()]);
    }
}
