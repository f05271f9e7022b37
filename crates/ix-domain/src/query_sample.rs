//! `QuerySample` and `FieldUsageAggregate`.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryShape {
    PointLookup,
    Range,
    JoinProbe,
    Aggregate,
    FullScan,
    Unknown,
}

/// One observed query execution. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySample {
    pub ts: DateTime<Utc>,
    pub tenant: Option<String>,
    pub table: String,
    /// Field, or a `+`-joined composite key set for multi-column candidates.
    pub field: String,
    pub shape: QueryShape,
    pub duration_ms: f64,
    pub rows_examined_estimate: Option<f64>,
    pub fingerprint: Option<Fingerprint>,
    pub is_write: bool,
}

/// A sliding-window rollup of `QuerySample`s keyed by (tenant, table, field,
/// shape). Derived; never hand-edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUsageAggregate {
    pub tenant: Option<String>,
    pub table: String,
    pub field: String,
    pub shape: Option<QueryShape>,
    pub count: u64,
    pub write_count: u64,
    pub durations_ms: Vec<f64>,
}

impl FieldUsageAggregate {
    pub fn average_ms(&self) -> f64 {
        if self.durations_ms.is_empty() {
            return 0.0;
        }
        self.durations_ms.iter().sum::<f64>() / self.durations_ms.len() as f64
    }

    fn percentile(&self, pct: f64) -> f64 {
        if self.durations_ms.is_empty() {
            return 0.0;
        }
        let mut sorted = self.durations_ms.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((sorted.len() as f64 - 1.0) * pct).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn p95_ms(&self) -> f64 {
        self.percentile(0.95)
    }

    pub fn p99_ms(&self) -> f64 {
        self.percentile(0.99)
    }

    pub fn read_write_ratio(&self) -> f64 {
        let reads = self.count.saturating_sub(self.write_count);
        if self.write_count == 0 {
            return f64::INFINITY;
        }
        reads as f64 / self.write_count as f64
    }
}

/// Aggregates a window of samples for one (tenant, table, field) key into
/// per-shape rollups.
pub fn aggregate(samples: &[QuerySample], tenant: Option<&str>, table: &str, field: &str) -> FieldUsageAggregate {
    let mut agg = FieldUsageAggregate {
        tenant: tenant.map(str::to_owned),
        table: table.to_owned(),
        field: field.to_owned(),
        shape: None,
        count: 0,
        write_count: 0,
        durations_ms: Vec::new(),
    };
    for sample in samples {
        if sample.table != table || sample.field != field {
            continue;
        }
        if sample.tenant.as_deref() != tenant {
            continue;
        }
        agg.count += 1;
        if sample.is_write {
            agg.write_count += 1;
        }
        agg.durations_ms.push(sample.duration_ms);
    }
    agg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(table: &str, field: &str, dur: f64, is_write: bool) -> QuerySample {
        QuerySample {
            ts: Utc::now(),
            tenant: Some("t1".into()),
            table: table.into(),
            field: field.into(),
            shape: QueryShape::PointLookup,
            duration_ms: dur,
            rows_examined_estimate: Some(100.0),
            fingerprint: None,
            is_write,
        }
    }

    #[test]
    fn aggregate_computes_percentiles() {
        let samples: Vec<_> = (1..=100).map(|i| sample("contacts", "email", i as f64, false)).collect();
        let agg = aggregate(&samples, Some("t1"), "contacts", "email");
        assert_eq!(agg.count, 100);
        assert_eq!(agg.p95_ms(), 95.0);
        assert_eq!(agg.p99_ms(), 99.0);
    }

    #[test]
    fn read_write_ratio_reflects_mix() {
        let mut samples: Vec<_> = (0..80).map(|_| sample("t", "f", 1.0, false)).collect();
        samples.extend((0..20).map(|_| sample("t", "f", 1.0, true)));
        let agg = aggregate(&samples, Some("t1"), "t", "f");
        assert_eq!(agg.read_write_ratio(), 4.0);
    }
}
