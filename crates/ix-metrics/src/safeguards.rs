use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

use parking_lot::RwLock;
use prometheus::IntCounterVec;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::REGISTRY;

static SAFEGUARD_ADMIT_DENY: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let opts = prometheus::Opts::new(
        "safeguard_gate_outcomes_total",
        "Per-gate admit/deny outcomes",
    );
    let counter =
        IntCounterVec::new(opts, &["gate", "outcome"]).expect("metric initialization failed");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration failed");
    counter
});

static CIRCUIT_TRANSITIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let opts = prometheus::Opts::new(
        "safeguard_circuit_breaker_transitions_total",
        "Circuit breaker state transitions",
    );
    let counter =
        IntCounterVec::new(opts, &["scope", "to_state"]).expect("metric initialization failed");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration failed");
    counter
});

/// The atomic-increment-discipline shared counters: the only write-hot
/// shared structure outside the connection pool. Every gate in `ix-safety`
/// writes here; `ix-observability` only reads.
pub struct SafeguardCounters {
    by_gate: RwLock<HashMap<&'static str, (AtomicU64, AtomicU64)>>,
}

impl Default for SafeguardCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeguardCounters {
    pub fn new() -> Self {
        Self {
            by_gate: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, gate: &'static str) -> parking_lot::MappedRwLockReadGuard<'_, (AtomicU64, AtomicU64)> {
        if !self.by_gate.read().contains_key(gate) {
            self.by_gate
                .write()
                .entry(gate)
                .or_insert_with(|| (AtomicU64::new(0), AtomicU64::new(0)));
        }
        parking_lot::RwLockReadGuard::map(self.by_gate.read(), |m| m.get(gate).unwrap())
    }

    pub fn record_admit(&self, gate: &'static str) {
        self.entry(gate).0.fetch_add(1, Ordering::Relaxed);
        SAFEGUARD_ADMIT_DENY.with_label_values(&[gate, "admit"]).inc();
    }

    pub fn record_deny(&self, gate: &'static str) {
        self.entry(gate).1.fetch_add(1, Ordering::Relaxed);
        SAFEGUARD_ADMIT_DENY.with_label_values(&[gate, "deny"]).inc();
    }

    pub fn record_circuit_transition(&self, scope: &str, to_state: &str) {
        CIRCUIT_TRANSITIONS
            .with_label_values(&[scope, to_state])
            .inc();
    }

    /// Snapshot of (admits, denies) for a gate, used by `verify` and tests.
    pub fn snapshot(&self, gate: &'static str) -> (u64, u64) {
        let guard = self.entry(gate);
        (guard.0.load(Ordering::Relaxed), guard.1.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_and_deny_are_independent_per_gate() {
        let counters = SafeguardCounters::new();
        counters.record_admit("rate_limiter");
        counters.record_admit("rate_limiter");
        counters.record_deny("rate_limiter");
        counters.record_deny("maintenance_window");
        assert_eq!(counters.snapshot("rate_limiter"), (2, 1));
        assert_eq!(counters.snapshot("maintenance_window"), (0, 1));
        assert_eq!(counters.snapshot("circuit_breaker"), (0, 0));
    }
}
