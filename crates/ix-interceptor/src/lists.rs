//! Learned allow-list and block-list. Each is a bounded LRU set of
//! [`Fingerprint`]s rather than an unbounded map — a process that runs for
//! months must not grow these without limit, and the least-recently-matched
//! fingerprint is the right one to evict first.

use std::num::NonZeroUsize;

use ix_domain::Fingerprint;
use lru::LruCache;

pub struct LearnedList {
    cache: LruCache<Fingerprint, ()>,
}

impl LearnedList {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn contains(&mut self, fingerprint: &Fingerprint) -> bool {
        self.cache.get(fingerprint).is_some()
    }

    pub fn reinforce(&mut self, fingerprint: Fingerprint) {
        self.cache.put(fingerprint, ());
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
