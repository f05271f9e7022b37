//! CPU throttle gate: samples system CPU periodically;
//! above threshold, admits nothing CPU-intensive until a cooldown elapses.
//! The sampler itself (reading `/proc/stat` or similar) is supplied by the
//! caller as a closure so this gate stays testable without a real OS
//! dependency; `ix-observability` wires the real sampler in.

use std::time::{
    Duration,
    Instant,
};

use parking_lot::Mutex;

struct State {
    throttled_since: Option<Instant>,
}

pub struct CpuThrottle {
    threshold_pct: f64,
    cooldown: Duration,
    state: Mutex<State>,
}

impl CpuThrottle {
    pub fn new(threshold_pct: f64, cooldown: Duration) -> Self {
        Self {
            threshold_pct,
            cooldown,
            state: Mutex::new(State { throttled_since: None }),
        }
    }

    /// `current_cpu_pct` is a fresh sample from the caller (0-100). Returns
    /// `true` if admitted. Once triggered, stays throttled for `cooldown`
    /// even if a subsequent sample briefly dips below threshold, to avoid
    /// flapping.
    pub fn admits(&self, current_cpu_pct: f64) -> bool {
        let mut state = self.state.lock();
        if current_cpu_pct >= self.threshold_pct {
            state.throttled_since = Some(Instant::now());
            return false;
        }
        if let Some(since) = state.throttled_since {
            if since.elapsed() < self.cooldown {
                return false;
            }
            state.throttled_since = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_below_threshold_with_no_history() {
        let throttle = CpuThrottle::new(80.0, Duration::from_secs(60));
        assert!(throttle.admits(40.0));
    }

    #[test]
    fn denies_above_threshold_and_during_cooldown() {
        let throttle = CpuThrottle::new(80.0, Duration::from_millis(50));
        assert!(!throttle.admits(95.0));
        assert!(!throttle.admits(10.0)); // still cooling down
    }

    #[test]
    fn admits_again_after_cooldown_elapses() {
        let throttle = CpuThrottle::new(80.0, Duration::from_millis(5));
        assert!(!throttle.admits(95.0));
        std::thread::sleep(Duration::from_millis(10));
        assert!(throttle.admits(10.0));
    }
}
