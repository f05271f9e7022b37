//! Token-bucket rate limiter, per (tenant, operation-kind). A
//! `governor`-backed keyed limiter using `governor`'s default real-time
//! clock.
//!
//! The adaptive variant replaces a key's bucket
//! with a freshly-quota'd one rather than mutating governor's fixed-quota
//! limiter in place.

use std::num::NonZeroU32;

use governor::{
    Quota,
    RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::nonzero;
use parking_lot::RwLock;
use std::collections::HashMap;

type KeyedLimiter = GovernorRateLimiter<String, governor::state::keyed::DefaultKeyedStateStore<String>, governor::clock::DefaultClock>;

pub struct RateLimiter {
    default_tokens: u32,
    default_refill_per_sec: f64,
    adaptive: bool,
    buckets: RwLock<HashMap<String, KeyedLimiter>>,
    observed_demand: RwLock<HashMap<String, Vec<f64>>>,
}

fn build_quota(tokens: u32, refill_per_sec: f64) -> Quota {
    let burst = NonZeroU32::new(tokens.max(1)).unwrap_or(nonzero!(1u32));
    let per_sec = refill_per_sec.max(0.1);
    Quota::per_second(NonZeroU32::new(per_sec.round().max(1.0) as u32).unwrap_or(nonzero!(1u32))).allow_burst(burst)
}

impl RateLimiter {
    pub fn new(tokens: u32, refill_per_sec: f64, adaptive: bool) -> Self {
        Self {
            default_tokens: tokens,
            default_refill_per_sec: refill_per_sec,
            adaptive,
            buckets: RwLock::new(HashMap::new()),
            observed_demand: RwLock::new(HashMap::new()),
        }
    }

    fn limiter_for(&self, key: &str) -> parking_lot::MappedRwLockReadGuard<'_, KeyedLimiter> {
        if !self.buckets.read().contains_key(key) {
            let quota = build_quota(self.default_tokens, self.default_refill_per_sec);
            self.buckets
                .write()
                .entry(key.to_owned())
                .or_insert_with(|| GovernorRateLimiter::keyed(quota));
        }
        parking_lot::RwLockReadGuard::map(self.buckets.read(), |m| m.get(key).unwrap())
    }

    /// Consumes one token for `key`. Returns `true` if admitted.
    pub fn admit(&self, key: &str) -> bool {
        let owned = key.to_owned();
        let limiter = self.limiter_for(key);
        limiter.check_key(&owned).is_ok()
    }

    /// Records one unit of observed demand for `key`, used by the adaptive
    /// variant to compute a p95 refill target.
    pub fn record_demand(&self, key: &str, demand_per_sec: f64) {
        if !self.adaptive {
            return;
        }
        let mut demand = self.observed_demand.write();
        let entry = demand.entry(key.to_owned()).or_default();
        entry.push(demand_per_sec);
        if entry.len() > 1_000 {
            entry.remove(0);
        }
    }

    /// Recomputes `key`'s refill rate to the 95th percentile of observed
    /// demand, replacing its bucket. No-op when the adaptive variant is
    /// disabled or there is no observed history yet.
    pub fn retune_adaptive(&self, key: &str) {
        if !self.adaptive {
            return;
        }
        let p95 = {
            let demand = self.observed_demand.read();
            let Some(samples) = demand.get(key) else { return };
            if samples.is_empty() {
                return;
            }
            let mut sorted = samples.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let idx = ((sorted.len() as f64 - 1.0) * 0.95).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        let quota = build_quota(self.default_tokens, p95.max(self.default_refill_per_sec));
        self.buckets.write().insert(key.to_owned(), GovernorRateLimiter::keyed(quota));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_burst_then_denies() {
        let limiter = RateLimiter::new(2, 1.0, false);
        assert!(limiter.admit("t1:build"));
        assert!(limiter.admit("t1:build"));
        assert!(!limiter.admit("t1:build"));
    }

    #[test]
    fn different_keys_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 1.0, false);
        assert!(limiter.admit("t1:build"));
        assert!(limiter.admit("t2:build"));
    }

    #[test]
    fn adaptive_retune_raises_capacity_toward_observed_demand() {
        let limiter = RateLimiter::new(1, 1.0, true);
        for d in [5.0, 6.0, 7.0, 100.0] {
            limiter.record_demand("t1:build", d);
        }
        limiter.retune_adaptive("t1:build");
        // After retuning to a higher refill rate, a short burst of
        // admissions should succeed where the original 1/sec quota alone
        // would have denied most of them.
        let admits = (0..3).filter(|_| limiter.admit("t1:build")).count();
        assert!(admits >= 1);
    }

    #[test]
    fn non_adaptive_limiter_ignores_demand_recording() {
        let limiter = RateLimiter::new(1, 1.0, false);
        limiter.record_demand("t1:build", 1000.0);
        limiter.retune_adaptive("t1:build");
        assert!(limiter.admit("t1:build"));
        assert!(!limiter.admit("t1:build"));
    }
}
