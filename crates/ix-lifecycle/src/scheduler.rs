//! Tier scheduling. A single driving tick (one `tokio::time::interval` in
//! `ix-daemon`'s supervisor) calls [`TierScheduler::due`] each time it
//! fires; this decides which of the three tiers, if any, is due rather than
//! owning three independent timers, so "consecutive ticks do not overlap"
//! is trivially true — there is exactly
//! one call site.

use std::time::{
    Duration,
    Instant,
};

use ix_config::LifecycleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Light,
    Standard,
    Heavy,
}

/// Heavy implies standard implies light: `LifecycleMaintainer::run_heavy`
/// already calls `run_standard`, which already calls `run_light`, so a
/// caller only ever needs to run the single tier this returns.
pub struct TierScheduler {
    light: Duration,
    standard: Duration,
    heavy: Duration,
    last_light: Option<Instant>,
    last_standard: Option<Instant>,
    last_heavy: Option<Instant>,
}

impl TierScheduler {
    pub fn new(config: &LifecycleConfig) -> Self {
        Self {
            light: Duration::from_secs(config.light_interval_secs),
            standard: Duration::from_secs(config.standard_interval_secs),
            heavy: Duration::from_secs(config.heavy_interval_secs),
            last_light: None,
            last_standard: None,
            last_heavy: None,
        }
    }

    fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
        match last {
            None => true,
            Some(t) => now.duration_since(t) >= interval,
        }
    }

    pub fn due(&mut self, now: Instant) -> Option<Tier> {
        if Self::is_due(self.last_heavy, self.heavy, now) {
            self.last_heavy = Some(now);
            self.last_standard = Some(now);
            self.last_light = Some(now);
            return Some(Tier::Heavy);
        }
        if Self::is_due(self.last_standard, self.standard, now) {
            self.last_standard = Some(now);
            self.last_light = Some(now);
            return Some(Tier::Standard);
        }
        if Self::is_due(self.last_light, self.light, now) {
            self.last_light = Some(now);
            return Some(Tier::Light);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LifecycleConfig {
        LifecycleConfig {
            light_interval_secs: 10,
            standard_interval_secs: 20,
            heavy_interval_secs: 40,
            ..LifecycleConfig::default()
        }
    }

    #[test]
    fn first_tick_always_runs_the_heaviest_tier() {
        let mut scheduler = TierScheduler::new(&config());
        assert_eq!(scheduler.due(Instant::now()), Some(Tier::Heavy));
    }

    #[test]
    fn tiers_come_due_on_their_own_cadence() {
        let mut scheduler = TierScheduler::new(&config());
        let t0 = Instant::now();
        assert_eq!(scheduler.due(t0), Some(Tier::Heavy));
        assert_eq!(scheduler.due(t0 + Duration::from_secs(5)), None);
        assert_eq!(scheduler.due(t0 + Duration::from_secs(15)), Some(Tier::Light));
        assert_eq!(scheduler.due(t0 + Duration::from_secs(25)), Some(Tier::Standard));
        assert_eq!(scheduler.due(t0 + Duration::from_secs(45)), Some(Tier::Heavy));
    }

    #[test]
    fn consecutive_ticks_never_return_two_tiers_at_once() {
        let mut scheduler = TierScheduler::new(&config());
        let t0 = Instant::now();
        let first = scheduler.due(t0);
        let second = scheduler.due(t0);
        assert!(first.is_some());
        assert_eq!(second, None, "a second call at the same instant has nothing newly due");
    }
}
