//! The feature vector every decision algorithm consumes.
//! A single shared shape keeps the heuristic, utility predictor and
//! classifier from disagreeing about what a "feature" means.

use ix_domain::{
    IndexKind,
    TableSizeBucket,
    WorkloadClass,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub selectivity: f64,
    pub estimated_rows_without_index: f64,
    pub write_frequency: f64,
    pub table_size_bucket: TableSizeBucket,
    pub workload_class: WorkloadClass,
    pub sustained: bool,
    pub spike_ratio: f64,
    pub query_count: u64,
    pub kind: IndexKind,
}
