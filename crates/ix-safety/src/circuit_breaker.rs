//! Per-scope circuit breaker:
//! closed → open after N consecutive build failures; open rejects without
//! issuing DDL; after a cooldown the breaker moves to half-open and admits
//! exactly one probe, closing again on its success or reopening on its
//! failure.

use std::{
    collections::HashMap,
    time::{
        Duration,
        Instant,
    },
};

use ix_metrics::SafeguardCounters;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct ScopeState {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    scopes: Mutex<HashMap<String, ScopeState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a mutation attempt on `scope_key` may proceed. In the
    /// `HalfOpen` state, admits exactly one probe and marks it in flight so
    /// concurrent callers are rejected until the probe resolves.
    pub fn admits(&self, scope_key: &str, counters: &SafeguardCounters) -> bool {
        let mut scopes = self.scopes.lock();
        let entry = scopes.entry(scope_key.to_owned()).or_default();
        let admitted = match entry.state {
            State::Closed => true,
            State::Open => {
                if entry.opened_at.map(|t| t.elapsed() >= self.cooldown).unwrap_or(false) {
                    entry.state = State::HalfOpen;
                    entry.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => {
                if entry.probe_in_flight {
                    false
                } else {
                    entry.probe_in_flight = true;
                    true
                }
            }
        };
        if admitted {
            counters.record_admit("circuit_breaker");
        } else {
            counters.record_deny("circuit_breaker");
        }
        admitted
    }

    pub fn record_success(&self, scope_key: &str, counters: &SafeguardCounters) {
        let mut scopes = self.scopes.lock();
        let entry = scopes.entry(scope_key.to_owned()).or_default();
        let was = entry.state;
        entry.consecutive_failures = 0;
        entry.state = State::Closed;
        entry.opened_at = None;
        entry.probe_in_flight = false;
        if was != State::Closed {
            counters.record_circuit_transition(scope_key, "closed");
        }
    }

    pub fn record_failure(&self, scope_key: &str, counters: &SafeguardCounters) {
        let mut scopes = self.scopes.lock();
        let entry = scopes.entry(scope_key.to_owned()).or_default();
        entry.probe_in_flight = false;
        match entry.state {
            State::HalfOpen => {
                entry.state = State::Open;
                entry.opened_at = Some(Instant::now());
                counters.record_circuit_transition(scope_key, "open");
            }
            State::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.failure_threshold {
                    entry.state = State::Open;
                    entry.opened_at = Some(Instant::now());
                    counters.record_circuit_transition(scope_key, "open");
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters() -> SafeguardCounters {
        SafeguardCounters::new()
    }

    #[test]
    fn opens_after_consecutive_failures_and_rejects_without_a_probe() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        let c = counters();
        assert!(breaker.admits("t1:contacts", &c));
        breaker.record_failure("t1:contacts", &c);
        assert!(breaker.admits("t1:contacts", &c));
        breaker.record_failure("t1:contacts", &c);
        assert!(breaker.admits("t1:contacts", &c));
        breaker.record_failure("t1:contacts", &c);
        assert!(!breaker.admits("t1:contacts", &c));
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        let c = counters();
        breaker.record_failure("t1:contacts", &c);
        assert!(!breaker.admits("t1:contacts", &c));
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.admits("t1:contacts", &c));
        assert!(!breaker.admits("t1:contacts", &c));
    }

    #[test]
    fn successful_probe_closes_the_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        let c = counters();
        breaker.record_failure("t1:contacts", &c);
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.admits("t1:contacts", &c));
        breaker.record_success("t1:contacts", &c);
        assert!(breaker.admits("t1:contacts", &c));
        assert!(breaker.admits("t1:contacts", &c));
    }

    #[test]
    fn failed_probe_reopens_the_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        let c = counters();
        breaker.record_failure("t1:contacts", &c);
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.admits("t1:contacts", &c));
        breaker.record_failure("t1:contacts", &c);
        assert!(!breaker.admits("t1:contacts", &c));
    }

    #[test]
    fn scopes_are_independent() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        let c = counters();
        breaker.record_failure("t1:contacts", &c);
        assert!(!breaker.admits("t1:contacts", &c));
        assert!(breaker.admits("t2:orders", &c));
    }
}
