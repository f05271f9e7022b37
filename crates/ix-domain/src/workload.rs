//! Workload classification shared by `ix-analyzer`, `ix-decision` and
//! `ix-safety`.

use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadClass {
    ReadHeavy,
    WriteHeavy,
    Balanced,
}

impl WorkloadClass {
    /// Classifies from a read/write ratio. The required-benefit multiplier
    /// is tied to this classification, not to the raw ratio directly, so the
    /// boundary only needs to be crossed once.
    pub fn from_ratio(read_write_ratio: f64) -> Self {
        if read_write_ratio >= 3.0 {
            WorkloadClass::ReadHeavy
        } else if read_write_ratio <= 1.0 / 3.0 {
            WorkloadClass::WriteHeavy
        } else {
            WorkloadClass::Balanced
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadClass::ReadHeavy => "read-heavy",
            WorkloadClass::WriteHeavy => "write-heavy",
            WorkloadClass::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSizeBucket {
    Small,
    Medium,
    Large,
}

impl TableSizeBucket {
    pub fn from_row_count(rows: u64, small_max: u64, medium_max: u64) -> Self {
        if rows <= small_max {
            TableSizeBucket::Small
        } else if rows <= medium_max {
            TableSizeBucket::Medium
        } else {
            TableSizeBucket::Large
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_published_boundaries() {
        assert_eq!(WorkloadClass::from_ratio(1.0 / 4.0), WorkloadClass::WriteHeavy);
        assert_eq!(WorkloadClass::from_ratio(1.0), WorkloadClass::Balanced);
        assert_eq!(WorkloadClass::from_ratio(4.0), WorkloadClass::ReadHeavy);
    }

    #[test]
    fn size_buckets_respect_thresholds() {
        assert_eq!(TableSizeBucket::from_row_count(100, 10_000, 1_000_000), TableSizeBucket::Small);
        assert_eq!(TableSizeBucket::from_row_count(50_000, 10_000, 1_000_000), TableSizeBucket::Medium);
        assert_eq!(TableSizeBucket::from_row_count(5_000_000, 10_000, 1_000_000), TableSizeBucket::Large);
    }
}
