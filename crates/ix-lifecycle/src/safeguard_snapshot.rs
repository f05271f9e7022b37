//! Task 13, safeguard metrics snapshot: a
//! point-in-time read of every gate's admit/deny counters for the periodic
//! tick to log. `ix-observability` (C13) reads the same counters for its
//! own endpoint; this module exists so `ix-daemon`'s tick can log a
//! snapshot without depending on `ix-observability` itself.

use ix_metrics::SafeguardCounters;

/// Mirrors `ix_safety::Denial::gate_name`'s closed set; kept as a literal
/// list here rather than a dependency on `ix-safety` just for five string
/// constants.
const GATES: [&str; 6] = [
    "maintenance_window",
    "rate_limiter",
    "cpu_throttle",
    "write_latency",
    "circuit_breaker",
    "lock_advisor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    pub gate: &'static str,
    pub admits: u64,
    pub denies: u64,
}

pub fn snapshot(counters: &SafeguardCounters) -> Vec<GateSnapshot> {
    GATES
        .iter()
        .map(|&gate| {
            let (admits, denies) = counters.snapshot(gate);
            GateSnapshot { gate, admits, denies }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_covers_every_known_gate() {
        let counters = SafeguardCounters::new();
        counters.record_admit("rate_limiter");
        counters.record_deny("circuit_breaker");
        let snap = snapshot(&counters);
        assert_eq!(snap.len(), GATES.len());
        assert!(snap.iter().any(|g| g.gate == "rate_limiter" && g.admits == 1 && g.denies == 0));
        assert!(snap.iter().any(|g| g.gate == "circuit_breaker" && g.denies == 1));
    }

    #[test]
    fn an_untouched_gate_reads_zero() {
        let counters = SafeguardCounters::new();
        let snap = snapshot(&counters);
        assert!(snap.iter().all(|g| g.admits == 0 && g.denies == 0));
    }
}
