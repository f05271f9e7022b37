//! Plan cache keyed by [`Fingerprint`], LRU with a TTL: an `lru::LruCache`
//! behind a `parking_lot::Mutex`, read-mostly with a lock only on
//! insert/evict, the same shape as `ix-gateway::pool::StatementCache`.

use std::time::{
    Duration,
    Instant,
};

use ix_domain::{
    Fingerprint,
    PlanSummary,
};
use ix_metrics::register_counter;
use lru::LruCache;
use parking_lot::Mutex;

register_counter!(PLANNER_CACHE_HITS, "Plan cache hits");
register_counter!(PLANNER_CACHE_MISSES, "Plan cache misses, including TTL expiry");

struct Entry {
    summary: PlanSummary,
    inserted_at: Instant,
}

pub struct PlanCache {
    ttl: Duration,
    inner: Mutex<LruCache<Fingerprint, Entry>>,
}

impl PlanCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(LruCache::new(std::num::NonZeroUsize::new(capacity.max(1)).unwrap())),
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<PlanSummary> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.get(key) else {
            PLANNER_CACHE_MISSES.inc();
            return None;
        };
        if entry.inserted_at.elapsed() > self.ttl {
            inner.pop(key);
            PLANNER_CACHE_MISSES.inc();
            return None;
        }
        PLANNER_CACHE_HITS.inc();
        Some(entry.summary.clone())
    }

    pub fn put(&self, key: Fingerprint, summary: PlanSummary) {
        self.inner.lock().put(
            key,
            Entry {
                summary,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hit_rate() -> f64 {
        let hits = PLANNER_CACHE_HITS.get() as f64;
        let misses = PLANNER_CACHE_MISSES.get() as f64;
        if hits + misses == 0.0 {
            return 0.0;
        }
        hits / (hits + misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint([byte; 16])
    }

    #[test]
    fn expired_entries_are_treated_as_misses() {
        let cache = PlanCache::new(10, Duration::from_millis(1));
        cache.put(fp(1), PlanSummary::default());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&fp(1)).is_none());
    }

    #[test]
    fn fresh_entries_hit() {
        let cache = PlanCache::new(10, Duration::from_secs(60));
        cache.put(fp(2), PlanSummary {
            estimated_cost: 42.0,
            ..Default::default()
        });
        assert_eq!(cache.get(&fp(2)).unwrap().estimated_cost, 42.0);
    }

    #[test]
    fn respects_capacity_by_evicting_lru() {
        let cache = PlanCache::new(1, Duration::from_secs(60));
        cache.put(fp(1), PlanSummary::default());
        cache.put(fp(2), PlanSummary::default());
        assert!(cache.get(&fp(1)).is_none());
        assert!(cache.get(&fp(2)).is_some());
    }
}
