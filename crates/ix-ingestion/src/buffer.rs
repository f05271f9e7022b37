//! The bounded ingestion buffer: a `Mutex`-guarded `VecDeque` that many
//! producers push into while a single flusher drains it in batches. Under
//! saturation the oldest sample is dropped rather than blocking the
//! producer, so `observe` always returns within a bounded time.

use std::collections::VecDeque;

use ix_domain::QuerySample;
use ix_metrics::register_counter;
use parking_lot::Mutex;

register_counter!(INGESTION_SAMPLES_DROPPED, "Samples dropped because the ingestion buffer was saturated");
register_counter!(INGESTION_SAMPLES_ENQUEUED, "Samples accepted into the ingestion buffer");

pub struct Buffer {
    capacity: usize,
    queue: Mutex<VecDeque<QuerySample>>,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    /// Enqueues `sample`. Never blocks: if the buffer is at capacity the
    /// oldest sample is evicted to make room and the drop counter
    /// increments.
    pub fn push(&self, sample: QuerySample) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            INGESTION_SAMPLES_DROPPED.inc();
        }
        queue.push_back(sample);
        INGESTION_SAMPLES_ENQUEUED.inc();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains up to `max` samples in FIFO order, for the flusher to batch
    /// into a single insert.
    pub fn drain(&self, max: usize) -> Vec<QuerySample> {
        let mut queue = self.queue.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    pub fn dropped_count() -> u64 {
        INGESTION_SAMPLES_DROPPED.get()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::QueryShape;

    use super::*;

    fn sample() -> QuerySample {
        QuerySample {
            ts: Utc::now(),
            tenant: None,
            table: "contacts".into(),
            field: "email".into(),
            shape: QueryShape::PointLookup,
            duration_ms: 1.0,
            rows_examined_estimate: None,
            fingerprint: None,
            is_write: false,
        }
    }

    #[test]
    fn under_capacity_nothing_is_dropped() {
        let buffer = Buffer::new(10);
        for _ in 0..5 {
            buffer.push(sample());
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn saturation_evicts_oldest_and_keeps_capacity() {
        let buffer = Buffer::new(3);
        for _ in 0..10 {
            buffer.push(sample());
        }
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn drain_removes_in_fifo_order_up_to_max() {
        let buffer = Buffer::new(100);
        for i in 0..10 {
            let mut s = sample();
            s.field = format!("f{i}");
            buffer.push(s);
        }
        let drained = buffer.drain(4);
        assert_eq!(drained.len(), 4);
        assert_eq!(drained[0].field, "f0");
        assert_eq!(buffer.len(), 6);
    }
}
