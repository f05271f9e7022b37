//! Pattern & selectivity analyzer.
//!
//! Aggregates a sliding window of `QuerySample`s into per-(tenant, table,
//! field) [`FieldAnalysis`], feeding `ix-decision`'s heuristic and
//! classifier layers. Windowing is sliding, default 24h; small-workload
//! detection (total queries below a threshold) marks the window "small" and
//! is read by `ix-decision` for its fast-path.

pub mod composite;
pub mod covering;
pub mod pattern;
pub mod selectivity;

use chrono::{
    DateTime,
    Duration,
    Utc,
};
use ix_domain::{
    aggregate,
    FieldUsageAggregate,
    PlanSummary,
    QuerySample,
};

pub use composite::CompositeOpportunity;
pub use covering::CoveringOpportunity;
pub use pattern::PatternClassification;

const DEFAULT_SUB_WINDOWS: u32 = 288; // 5-minute buckets over a 24h window.

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAnalysis {
    pub tenant: Option<String>,
    pub table: String,
    pub field: String,
    pub usage: FieldUsageAggregate,
    pub selectivity: f64,
    pub pattern: PatternClassification,
}

/// Analyzes one (tenant, table, field) key's samples within `window`,
/// ending at `now`. `distinct_values`/`table_row_count` drive selectivity
/// (distinct-count sampling preferred, plan-derived fallback otherwise).
#[allow(clippy::too_many_arguments)]
pub fn analyze_field(
    samples: &[QuerySample],
    tenant: Option<&str>,
    table: &str,
    field: &str,
    now: DateTime<Utc>,
    window: Duration,
    sustained_min_count: u64,
    spike_fraction: f64,
    distinct_values: Option<(u64, u64)>,
    plan_fallback: Option<&PlanSummary>,
    table_row_count: u64,
) -> FieldAnalysis {
    let window_start = now - window;
    let in_window: Vec<QuerySample> = samples
        .iter()
        .filter(|s| s.ts >= window_start && s.ts <= now)
        .cloned()
        .collect();
    let usage = aggregate(&in_window, tenant, table, field);
    let pattern = pattern::classify(
        &in_window,
        window_start,
        window,
        DEFAULT_SUB_WINDOWS,
        sustained_min_count,
        spike_fraction,
    );
    let selectivity = match distinct_values {
        Some((distinct, total)) => selectivity::from_distinct_count(distinct, total),
        None => plan_fallback.map(|p| selectivity::from_plan(p, table_row_count)).unwrap_or(0.0),
    };
    FieldAnalysis {
        tenant: tenant.map(str::to_owned),
        table: table.to_owned(),
        field: field.to_owned(),
        usage,
        selectivity,
        pattern,
    }
}

/// Small-workload detection: total queries below a threshold (e.g. 5000)
/// marks the window as small.
pub fn is_small_workload(total_queries_in_window: u64, threshold: u64) -> bool {
    total_queries_in_window < threshold
}

/// The small-workload fast path caps pattern analysis to the top
/// `max_patterns` fingerprints by sample count.
pub fn top_fingerprints_by_volume(samples: &[QuerySample], max_patterns: usize) -> Vec<ix_domain::Fingerprint> {
    let mut counts: std::collections::HashMap<ix_domain::Fingerprint, u64> = std::collections::HashMap::new();
    for sample in samples {
        if let Some(fp) = sample.fingerprint {
            *counts.entry(fp).or_insert(0) += 1;
        }
    }
    let mut ordered: Vec<(ix_domain::Fingerprint, u64)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered.truncate(max_patterns);
    ordered.into_iter().map(|(fp, _)| fp).collect()
}

#[cfg(test)]
mod tests {
    use ix_domain::QueryShape;

    use super::*;

    fn sample_at(ts: DateTime<Utc>, fp: Option<ix_domain::Fingerprint>) -> QuerySample {
        QuerySample {
            ts,
            tenant: Some("t1".into()),
            table: "contacts".into(),
            field: "email".into(),
            shape: QueryShape::PointLookup,
            duration_ms: 25.0,
            rows_examined_estimate: Some(1.0),
            fingerprint: fp,
            is_write: false,
        }
    }

    #[test]
    fn window_excludes_samples_outside_range() {
        let now = Utc::now();
        let window = Duration::hours(24);
        let samples = vec![
            sample_at(now - Duration::hours(1), None),
            sample_at(now - Duration::hours(48), None),
        ];
        let analysis = analyze_field(
            &samples,
            Some("t1"),
            "contacts",
            "email",
            now,
            window,
            1,
            0.5,
            Some((950, 1000)),
            None,
            1000,
        );
        assert_eq!(analysis.usage.count, 1);
    }

    #[test]
    fn small_workload_threshold_matches_spec_default() {
        assert!(is_small_workload(4999, 5000));
        assert!(!is_small_workload(5000, 5000));
    }

    #[test]
    fn top_fingerprints_caps_and_sorts_by_volume() {
        let fp1 = ix_domain::Fingerprint([1; 16]);
        let fp2 = ix_domain::Fingerprint([2; 16]);
        let now = Utc::now();
        let mut samples: Vec<_> = (0..3).map(|_| sample_at(now, Some(fp1))).collect();
        samples.extend((0..10).map(|_| sample_at(now, Some(fp2))));
        let top = top_fingerprints_by_volume(&samples, 1);
        assert_eq!(top, vec![fp2]);
    }
}
