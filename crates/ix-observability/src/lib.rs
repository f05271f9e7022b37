//! Observability.
//!
//! The counters themselves live in `ix-metrics::SafeguardCounters` (every
//! gate, circuit breaker and decision layer writes there directly); this
//! crate is the read-mostly collaborator that turns that raw state plus a
//! liveness probe and two readiness latches into a combined health
//! snapshot: liveness, readiness, and safeguard counters. None of it serves
//! HTTP itself — a dashboard that would is an external collaborator.

pub mod cpu;
pub mod degradation;
pub mod liveness;
pub mod readiness;

use std::{
    sync::Arc,
    time::Duration,
};

use degradation::DegradationTracker;
use ix_gateway::ConnectionPool;
use ix_metrics::SafeguardCounters;
use readiness::Readiness;
use serde::Serialize;

/// Gate names every C7 gate, plus the interceptor and lifecycle maintainer,
/// register admit/deny outcomes under. Kept here rather than derived from
/// `SafeguardCounters` (which only knows the gates someone has already
/// called) so `verify`'s report always lists every gate, even ones that
/// have never fired.
pub const KNOWN_GATES: &[&str] = &[
    "maintenance_window",
    "rate_limiter",
    "cpu_throttle",
    "write_latency",
    "circuit_breaker",
    "lock_advisor",
    "interceptor",
    "lifecycle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServingStatus {
    NotServing,
    Serving,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    pub gate: String,
    pub admits: u64,
    pub denies: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: ServingStatus,
    pub live: bool,
    pub bootstrap_complete: bool,
    pub first_flush_succeeded: bool,
    pub degraded_components: Vec<String>,
    pub gates: Vec<GateReport>,
}

/// Aggregates the readiness latches and the degradation tracker behind one
/// handle; `ix-daemon`'s supervisor owns one per process and hands clones of
/// the `Arc` to every component that can report a failure.
pub struct HealthState {
    pool: Arc<ConnectionPool>,
    readiness: Readiness,
    degradation: DegradationTracker,
}

impl HealthState {
    pub fn new(pool: Arc<ConnectionPool>, degraded_window: Duration, degraded_threshold: usize) -> Self {
        Self {
            pool,
            readiness: Readiness::new(),
            degradation: DegradationTracker::new(degraded_window, degraded_threshold),
        }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn degradation(&self) -> &DegradationTracker {
        &self.degradation
    }

    /// Runs the liveness probe and folds every signal into one snapshot,
    /// suitable for the `verify` CLI subcommand or a hosting application's
    /// own health endpoint to serialize directly.
    pub async fn snapshot(&self, counters: &SafeguardCounters, liveness_timeout: Duration) -> HealthSnapshot {
        let live = liveness::check(&self.pool, liveness_timeout).await.unwrap_or(false);
        let degraded_components = self.degradation.degraded_components();
        let status = if !self.readiness.is_ready() {
            ServingStatus::NotServing
        } else if !live || !degraded_components.is_empty() {
            ServingStatus::Degraded
        } else {
            ServingStatus::Serving
        };
        let gates = KNOWN_GATES
            .iter()
            .map(|gate| {
                let (admits, denies) = counters.snapshot(gate);
                GateReport {
                    gate: (*gate).to_owned(),
                    admits,
                    denies,
                }
            })
            .collect();
        HealthSnapshot {
            status,
            live,
            bootstrap_complete: self.readiness.bootstrap_complete(),
            first_flush_succeeded: self.readiness.first_flush_succeeded(),
            degraded_components,
            gates,
        }
    }
}
