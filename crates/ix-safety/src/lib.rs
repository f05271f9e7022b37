//! Safety gates. Every gate admits or denies
//! independently; `ix-executor` consults [`SafetyGates::check_all`] before
//! issuing DDL and the individual gates afterward to record the outcome of
//! the attempt (circuit breaker, canary).
//!
//! None of these gates talk to the database directly except
//! [`lock_advisor::db`], which `ix-executor` calls itself around the DDL
//! statement; everything else here is in-process bookkeeping so the gates
//! stay cheap to consult on every mutation attempt.

mod canary;
mod circuit_breaker;
mod cpu_throttle;
mod lock_advisor;
mod rate_limiter;
mod window;
mod write_latency;

use chrono::Utc;
use ix_config::SafetyConfig;
use ix_metrics::SafeguardCounters;

pub use canary::{
    CanaryTracker,
    CanaryVerdict,
};
pub use circuit_breaker::CircuitBreaker;
pub use cpu_throttle::CpuThrottle;
pub use lock_advisor::{
    db as lock_advisor_db,
    LockAdvisor,
};
pub use rate_limiter::RateLimiter;
pub use window::admits as maintenance_window_admits;
pub use write_latency::WriteLatencyMonitor;

/// Why a mutation attempt was denied, in gate-evaluation order. `ix-executor`
/// and `ix-lineage` record this as the `GateOutcome` reason on a rejected
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    OutsideMaintenanceWindow,
    RateLimited,
    CpuThrottled,
    WriteLatencyExceeded,
    CircuitOpen,
    LockHeld,
}

impl Denial {
    pub fn gate_name(self) -> &'static str {
        match self {
            Denial::OutsideMaintenanceWindow => "maintenance_window",
            Denial::RateLimited => "rate_limiter",
            Denial::CpuThrottled => "cpu_throttle",
            Denial::WriteLatencyExceeded => "write_latency",
            Denial::CircuitOpen => "circuit_breaker",
            Denial::LockHeld => "lock_advisor",
        }
    }
}

/// Aggregates every C7 gate behind the config that provisions them.
pub struct SafetyGates {
    pub rate_limiter: RateLimiter,
    pub cpu_throttle: CpuThrottle,
    pub write_latency: WriteLatencyMonitor,
    pub circuit_breaker: CircuitBreaker,
    pub lock_advisor: LockAdvisor,
    pub canary: CanaryTracker,
    window: ix_config::MaintenanceWindow,
    canary_enabled: bool,
    canary_pct: f64,
}

impl SafetyGates {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            rate_limiter: RateLimiter::new(config.rate_limit_tokens, config.rate_limit_refill_per_sec, config.rate_limit_adaptive),
            cpu_throttle: CpuThrottle::new(config.cpu_threshold_pct, std::time::Duration::from_secs(config.cpu_cooldown_secs)),
            write_latency: WriteLatencyMonitor::new(config.write_latency_p95_ceiling_ms),
            circuit_breaker: CircuitBreaker::new(config.circuit_breaker_failure_threshold, std::time::Duration::from_secs(config.circuit_breaker_cooldown_secs)),
            lock_advisor: LockAdvisor::new(std::time::Duration::from_secs(config.lock_ttl_secs)),
            canary: CanaryTracker::new(config.canary_min_samples, config.canary_success_threshold),
            window: config.maintenance_window.clone(),
            canary_enabled: config.canary_enabled,
            canary_pct: config.canary_pct,
        }
    }

    pub fn canary_enabled(&self) -> bool {
        self.canary_enabled
    }

    /// Percent, `0.0..=100.0`, of post-build traffic sampled as canary
    /// outcomes. Only consulted when [`Self::canary_enabled`] is set.
    pub fn canary_pct(&self) -> f64 {
        self.canary_pct
    }

    /// Runs every pre-DDL gate in a fixed order, short-circuiting on the
    /// first denial and recording admit/deny into
    /// `counters` for each gate consulted along the way. Does not acquire
    /// the advisory lock itself (`ix-executor` holds it across the DDL
    /// statement and releases it afterward); this only checks it is free.
    pub fn check_all(&self, scope_key: &str, rate_key: &str, current_cpu_pct: f64, emergency: bool, counters: &SafeguardCounters) -> Result<(), Denial> {
        if window::admits(&self.window, Utc::now(), emergency) {
            counters.record_admit("maintenance_window");
        } else {
            counters.record_deny("maintenance_window");
            return Err(Denial::OutsideMaintenanceWindow);
        }

        if self.rate_limiter.admit(rate_key) {
            counters.record_admit("rate_limiter");
        } else {
            counters.record_deny("rate_limiter");
            return Err(Denial::RateLimited);
        }

        if self.cpu_throttle.admits(current_cpu_pct) {
            counters.record_admit("cpu_throttle");
        } else {
            counters.record_deny("cpu_throttle");
            return Err(Denial::CpuThrottled);
        }

        if self.write_latency.admits(scope_key) {
            counters.record_admit("write_latency");
        } else {
            counters.record_deny("write_latency");
            return Err(Denial::WriteLatencyExceeded);
        }

        if !self.lock_advisor.try_acquire(scope_key) {
            counters.record_deny("lock_advisor");
            return Err(Denial::LockHeld);
        }
        counters.record_admit("lock_advisor");
        self.lock_advisor.release(scope_key);

        // Checked last: on an elapsed cooldown this transitions the breaker
        // Open -> HalfOpen and marks a probe in flight, which only resolves
        // via `record_success`/`record_failure` once the caller actually
        // issues DDL. Every earlier gate above is a pure read (or an
        // acquire-then-immediately-release probe), so a denial there never
        // leaves the breaker holding a probe no one will ever resolve.
        if self.circuit_breaker.admits(scope_key, counters) {
            // already recorded by the breaker itself
        } else {
            return Err(Denial::CircuitOpen);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SafetyConfig {
        SafetyConfig::default()
    }

    #[test]
    fn check_all_admits_by_default() {
        let gates = SafetyGates::new(&config());
        let counters = SafeguardCounters::new();
        assert!(gates.check_all("t1:contacts", "t1:build", 10.0, false, &counters).is_ok());
    }

    #[test]
    fn cpu_throttle_denies_before_later_gates_are_reached() {
        let gates = SafetyGates::new(&config());
        let counters = SafeguardCounters::new();
        let result = gates.check_all("t1:contacts", "t1:build", 99.0, false, &counters);
        assert_eq!(result, Err(Denial::CpuThrottled));
        assert_eq!(counters.snapshot("write_latency"), (0, 0));
    }

    #[test]
    fn open_circuit_denies_mutation_attempts() {
        let gates = SafetyGates::new(&config());
        let counters = SafeguardCounters::new();
        for _ in 0..config().circuit_breaker_failure_threshold {
            gates.circuit_breaker.record_failure("t1:contacts", &counters);
        }
        let result = gates.check_all("t1:contacts", "t1:build", 10.0, false, &counters);
        assert_eq!(result, Err(Denial::CircuitOpen));
    }
}
