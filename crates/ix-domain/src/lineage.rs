//! `MutationEvent` and `AlgorithmUsage`.
//!
//! Value types only; `ix-lineage` owns persistence. Keeping these in
//! `ix-domain` lets `ix-decision`, `ix-safety` and `ix-executor` all build a
//! [`MutationEvent`] without depending on `ix-lineage`'s storage code
//!.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

use crate::{
    plan::PlanSummary,
    workload::WorkloadClass,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Engine,
    Maintainer,
    Operator,
}

impl Actor {
    pub fn as_str(self) -> &'static str {
        match self {
            Actor::Engine => "engine",
            Actor::Maintainer => "maintainer",
            Actor::Operator => "operator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Created,
    Promoted,
    Dropped,
    RolledBack,
    Rejected,
    Skipped,
    Failed,
    Interrupted,
}

/// One gate's admission decision, folded into [`DecisionRationale`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: String,
    pub admitted: bool,
    pub reason: String,
}

/// The combined output of every `ix-decision` layer for one candidate: the
/// rationale object. Always attached to a [`MutationEvent`], win or lose, so
/// a reject carries exactly the same explanatory shape as a create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DecisionRationale {
    pub heuristic_score: Option<f64>,
    pub utility_prediction: Option<f64>,
    pub classifier_probability: Option<f64>,
    pub constraint_result: Option<bool>,
    pub workload_class: Option<WorkloadClass>,
    pub gate_outcomes: Vec<GateOutcome>,
    pub confidence: Option<f64>,
    pub predicted_benefit: Option<f64>,
    /// Set by S3/S4-style rejections for a spike-only or workload-modulated
    /// pattern; carried as a flag rather than inferred from `explanation`
    /// text so tests can assert on it directly.
    pub spike: bool,
}

/// Append-only lineage entry. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub id: Uuid,
    /// References an `IndexRecord` by value, never by ownership link.
    pub index_ref: Uuid,
    pub ts: DateTime<Utc>,
    /// Monotonic, per-scope append-order tiebreaker.
    pub seq: u64,
    pub actor: Actor,
    pub kind: MutationKind,
    pub rationale: DecisionRationale,
    pub before_summary: Option<PlanSummary>,
    pub after_summary: Option<PlanSummary>,
    pub improvement: Option<f64>,
    pub explanation: String,
}

/// Append-only ledger tagging each decision with the algorithms consulted.
/// Used for audit and ML retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmUsage {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub algorithm: String,
    pub scope: String,
    pub input_hash: String,
    pub output: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rationale_defaults_to_no_spike() {
        let rationale = DecisionRationale::default();
        assert!(!rationale.spike);
        assert!(rationale.gate_outcomes.is_empty());
    }
}
