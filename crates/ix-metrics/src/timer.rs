use std::time::{
    Duration,
    Instant,
};

use prometheus::Histogram;

/// Times a scope and records the elapsed duration into a histogram on drop.
pub struct Timer {
    start: Instant,
    histogram: &'static Histogram,
    cancelled: bool,
}

impl Timer {
    pub fn new(histogram: &'static Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
            cancelled: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Don't record this timer's duration; used when the operation being
    /// timed was abandoned rather than completed.
    pub fn cancel(mut self) {
        self.cancelled = true;
        drop(self);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.cancelled {
            self.histogram.observe(self.start.elapsed().as_secs_f64());
        }
    }
}

/// A timer that records into one of two histograms depending on success.
/// Used at gateway/plan-introspector call sites where success/failure rates
/// matter as much as latency.
pub struct StatusTimer {
    start: Instant,
    success: &'static Histogram,
    failure: &'static Histogram,
}

impl StatusTimer {
    pub fn new(success: &'static Histogram, failure: &'static Histogram) -> Self {
        Self {
            start: Instant::now(),
            success,
            failure,
        }
    }

    pub fn finish(self, ok: bool) {
        let elapsed = self.start.elapsed().as_secs_f64();
        if ok {
            self.success.observe(elapsed);
        } else {
            self.failure.observe(elapsed);
        }
    }
}
