//! Heuristic cost/benefit layer.
//!
//! `estimatedBenefit = estimatedRowsWithoutIndex * (costFactorSeqScan -
//! costFactorIndex) * selectivity`; `maintenanceCost = writeFrequency *
//! writeOverheadFactor(kind)`; `buildCost` scales with table size. Positive
//! when `totalBenefit` over a horizon exceeds `buildCost + maintenanceCost`.

use ix_domain::TableSizeBucket;

use crate::{
    algorithm::DecisionAlgorithm,
    features::Features,
};

const COST_FACTOR_SEQ_SCAN: f64 = 1.0;
const COST_FACTOR_INDEX: f64 = 0.05;
/// Queries-per-horizon multiplier applied to per-query benefit, i.e. how
/// many times the pattern is expected to repeat before the next
/// maintenance review.
const HORIZON_QUERY_MULTIPLIER: f64 = 30.0;

fn build_cost(bucket: TableSizeBucket) -> f64 {
    match bucket {
        TableSizeBucket::Small => 1.0,
        TableSizeBucket::Medium => 10.0,
        TableSizeBucket::Large => 100.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicResult {
    pub estimated_benefit: f64,
    pub maintenance_cost: f64,
    pub build_cost: f64,
    pub positive: bool,
}

pub fn evaluate(features: &Features) -> HeuristicResult {
    let per_query_benefit =
        features.estimated_rows_without_index * (COST_FACTOR_SEQ_SCAN - COST_FACTOR_INDEX) * features.selectivity;
    let total_benefit = per_query_benefit * HORIZON_QUERY_MULTIPLIER;
    let maintenance_cost = features.write_frequency * features.kind.write_overhead_factor();
    let build = build_cost(features.table_size_bucket);
    HeuristicResult {
        estimated_benefit: total_benefit,
        maintenance_cost,
        build_cost: build,
        positive: total_benefit > build + maintenance_cost,
    }
}

/// A [`DecisionAlgorithm`] wrapper so the heuristic composes with the other
/// layers through the same capability set. `predict` returns a normalized
/// score in `[0, 1]` (benefit over benefit+cost) rather than the raw
/// benefit value, so the engine can weight it alongside the other layers'
/// probabilities.
pub struct Heuristic;

impl DecisionAlgorithm for Heuristic {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn predict(&self, features: &Features) -> f64 {
        let result = evaluate(features);
        let denom = result.estimated_benefit + result.maintenance_cost + result.build_cost;
        if denom <= 0.0 {
            return 0.0;
        }
        (result.estimated_benefit / denom).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use ix_domain::{
        IndexKind,
        WorkloadClass,
    };

    use super::*;

    fn features(rows: f64, selectivity: f64, write_freq: f64, bucket: TableSizeBucket) -> Features {
        Features {
            selectivity,
            estimated_rows_without_index: rows,
            write_frequency: write_freq,
            table_size_bucket: bucket,
            workload_class: WorkloadClass::Balanced,
            sustained: true,
            spike_ratio: 0.1,
            query_count: 2000,
            kind: IndexKind::Btree,
        }
    }

    #[test]
    fn high_selectivity_sustained_traffic_is_positive() {
        let result = evaluate(&features(1000.0, 0.95, 10.0, TableSizeBucket::Medium));
        assert!(result.positive);
    }

    #[test]
    fn low_selectivity_is_not_worth_it() {
        let result = evaluate(&features(1000.0, 0.02, 10.0, TableSizeBucket::Medium));
        assert!(!result.positive);
    }

    #[test]
    fn heavy_write_load_raises_maintenance_cost_above_benefit() {
        let result = evaluate(&features(50.0, 0.5, 100_000.0, TableSizeBucket::Small));
        assert!(!result.positive);
    }
}
