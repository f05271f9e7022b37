//! Sustained-vs-spike pattern detection. A pattern is "sustained" when the trailing window's query
//! count exceeds a threshold AND is not concentrated in a single short
//! sub-window; spikes are recorded but never justify index creation alone.

use chrono::{
    DateTime,
    Duration,
    Utc,
};
use ix_domain::QuerySample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternClassification {
    pub count: u64,
    /// Fraction of all samples that land in the single busiest sub-window.
    pub spike_ratio: f64,
    pub sustained: bool,
}

/// Splits `window` into `sub_window_count` equal buckets and finds the
/// fraction of samples concentrated in the busiest one. `sustained_min_count`
/// and `spike_fraction` come from the decision engine's configuration.
pub fn classify(
    samples: &[QuerySample],
    window_start: DateTime<Utc>,
    window: Duration,
    sub_window_count: u32,
    sustained_min_count: u64,
    spike_fraction: f64,
) -> PatternClassification {
    let count = samples.len() as u64;
    if count == 0 || sub_window_count == 0 {
        return PatternClassification {
            count,
            spike_ratio: 0.0,
            sustained: false,
        };
    }
    let sub_window = window / sub_window_count as i32;
    let mut buckets = vec![0u64; sub_window_count as usize];
    for sample in samples {
        let offset = sample.ts - window_start;
        let idx = if sub_window.num_milliseconds() <= 0 {
            0
        } else {
            (offset.num_milliseconds() / sub_window.num_milliseconds()).clamp(0, sub_window_count as i64 - 1) as usize
        };
        buckets[idx] += 1;
    }
    let busiest = *buckets.iter().max().unwrap_or(&0);
    let spike_ratio = busiest as f64 / count as f64;
    let sustained = count >= sustained_min_count && spike_ratio < spike_fraction;
    PatternClassification {
        count,
        spike_ratio,
        sustained,
    }
}

#[cfg(test)]
mod tests {
    use ix_domain::QueryShape;

    use super::*;

    fn sample_at(ts: DateTime<Utc>) -> QuerySample {
        QuerySample {
            ts,
            tenant: Some("t1".into()),
            table: "contacts".into(),
            field: "email".into(),
            shape: QueryShape::PointLookup,
            duration_ms: 25.0,
            rows_examined_estimate: Some(1.0),
            fingerprint: None,
            is_write: false,
        }
    }

    #[test]
    fn uniformly_spread_samples_are_sustained() {
        let start = Utc::now();
        let window = Duration::hours(24);
        let samples: Vec<_> = (0..2000)
            .map(|i| sample_at(start + Duration::minutes(i % (24 * 60))))
            .collect();
        let result = classify(&samples, start, window, 288, 1000, 0.5);
        assert!(result.sustained, "spike_ratio={}", result.spike_ratio);
    }

    #[test]
    fn concentrated_samples_are_a_spike_not_sustained() {
        let start = Utc::now();
        let window = Duration::hours(24);
        let samples: Vec<_> = (0..2000).map(|i| sample_at(start + Duration::seconds(i % 300))).collect();
        let result = classify(&samples, start, window, 288, 1000, 0.5);
        assert!(!result.sustained);
        assert!(result.spike_ratio > 0.5);
    }
}
