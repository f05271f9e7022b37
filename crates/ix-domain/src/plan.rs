//! `PlanSummary`.
//!
//! A structured distillation of a database execution plan. Produced by
//! `ix-planner` from `EXPLAIN (FORMAT JSON)` output; consumed by `ix-decision`
//! (candidate screening) and `ix-executor` (before/after validation) without
//! either caller re-parsing raw plan JSON.

use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub node_type: String,
    pub relation: Option<String>,
    pub index_name: Option<String>,
    pub estimated_cost: f64,
    pub estimated_rows: f64,
    pub is_seq_scan: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlanSummary {
    pub estimated_cost: f64,
    pub estimated_rows: f64,
    /// Tables touched by the plan that were scanned sequentially.
    pub seq_scan_tables: Vec<String>,
    pub chosen_index_names: Vec<String>,
    /// The highest-cost nodes, sorted descending, truncated to a handful.
    pub top_cost_nodes: Vec<PlanNode>,
    /// Wall-clock time Postgres reported, only present for `planAnalyze`.
    pub actual_duration_ms: Option<f64>,
}

impl PlanSummary {
    pub fn touches_sequential_scan(&self, table: &str) -> bool {
        self.seq_scan_tables.iter().any(|t| t == table)
    }

    /// `improvement = 1 - (costAfter / costBefore)`, clamped to `[-1, 1]`.
    /// `before` is `self`.
    pub fn improvement_over(&self, after: &PlanSummary) -> f64 {
        if self.estimated_cost <= 0.0 {
            return 0.0;
        }
        (1.0 - after.estimated_cost / self.estimated_cost).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improvement_is_clamped() {
        let before = PlanSummary {
            estimated_cost: 100.0,
            ..Default::default()
        };
        let much_better = PlanSummary {
            estimated_cost: -500.0,
            ..Default::default()
        };
        assert_eq!(before.improvement_over(&much_better), 1.0);
    }

    #[test]
    fn zero_cost_before_is_neutral() {
        let before = PlanSummary::default();
        let after = PlanSummary {
            estimated_cost: 10.0,
            ..Default::default()
        };
        assert_eq!(before.improvement_over(&after), 0.0);
    }
}
