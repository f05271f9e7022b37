//! C6: decision engine. Combines the heuristic, utility,
//! classifier and constraint layers into a single weighted decision per
//! candidate, after an early-exit precedence chain that skips a candidate
//! cheaply before running the layers at all.

use ix_config::DecisionConfig;
use ix_domain::{
    DecisionRationale,
    GateOutcome,
    IndexCandidate,
    WorkloadClass,
};

use crate::{
    classifier::Classifier,
    constraint::{
        self,
        ConstraintInput,
        ConstraintOutcome,
    },
    features::Features,
    heuristic::Heuristic,
    modulation,
    utility::UtilityPredictor,
};

/// Precomputed admission signals the engine's early-exit chain consumes.
/// These come from `ix-safety` (C7) and `ix-executor`'s live `IndexRecord`
/// set; the engine does not re-implement the gates themselves, it only
/// short-circuits before running the decision layers when one is already
/// known to fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyExitSignals {
    pub active_equivalent_exists: bool,
    pub write_monitor_flagged: bool,
    pub rate_limit_exceeded: bool,
    pub outside_maintenance_window: bool,
    pub per_table_index_count_cap_reached: bool,
    /// Minimum sustained query count for this candidate's size bucket,
    /// already reduced for a small workload if applicable.
    pub query_volume_threshold: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub candidate: IndexCandidate,
    pub approved: bool,
    pub rationale: DecisionRationale,
    pub explanation: String,
}

pub struct DecisionEngine {
    heuristic: Heuristic,
    utility: UtilityPredictor,
    classifier: Classifier,
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            heuristic: Heuristic,
            utility: UtilityPredictor::default(),
            classifier: Classifier::default(),
            config,
        }
    }

    fn reject(candidate: IndexCandidate, mut rationale: DecisionRationale, gate: &str, reason: &str) -> Decision {
        rationale.gate_outcomes.push(GateOutcome {
            gate: gate.to_owned(),
            admitted: false,
            reason: reason.to_owned(),
        });
        Decision {
            explanation: format!("rejected: {reason}"),
            candidate,
            approved: false,
            rationale,
        }
    }

    /// Evaluates one candidate end to end: early exits, then the weighted
    /// combination of layers, constraint veto included.
    pub fn evaluate(
        &self,
        candidate: IndexCandidate,
        features: Features,
        signals: EarlyExitSignals,
        constraint_input: ConstraintInput,
        constraint_enabled: bool,
    ) -> Decision {
        let mut rationale = DecisionRationale {
            workload_class: Some(features.workload_class),
            spike: !features.sustained && features.spike_ratio >= 0.5,
            ..Default::default()
        };

        if signals.active_equivalent_exists {
            return Self::reject(candidate, rationale, "equivalent_index", "an active equivalent index already exists");
        }
        if signals.write_monitor_flagged {
            return Self::reject(candidate, rationale, "write_latency_monitor", "write-performance monitor currently flags the table");
        }
        if !features.sustained && features.spike_ratio >= 0.5 {
            return Self::reject(candidate, rationale, "pattern", "spike");
        }
        if signals.rate_limit_exceeded {
            return Self::reject(candidate, rationale, "rate_limiter", "rate limit exceeded");
        }
        if signals.outside_maintenance_window {
            return Self::reject(candidate, rationale, "maintenance_window", "outside maintenance window");
        }
        if features.query_count < signals.query_volume_threshold {
            return Self::reject(candidate, rationale, "query_volume", "query volume below size-bucket threshold");
        }
        if signals.per_table_index_count_cap_reached {
            return Self::reject(candidate, rationale, "index_count_cap", "per-table index-count cap reached");
        }

        let heuristic_score = self.heuristic.predict(&features);
        let utility_prediction = self.utility.score(&features);
        let classifier_probability = self.classifier.predict_kept_probability(&features);

        let modulation = modulation::for_class(features.workload_class);
        let weights = &self.config.weights;
        let mut combined = heuristic_score * weights.heuristic
            + utility_prediction * weights.ml_utility
            + classifier_probability * weights.classifier;
        combined *= modulation.confidence_multiplier;

        rationale.heuristic_score = Some(heuristic_score);
        rationale.utility_prediction = Some(utility_prediction);
        rationale.classifier_probability = Some(classifier_probability);
        rationale.confidence = Some(combined.clamp(0.0, 1.0));
        rationale.predicted_benefit = Some(utility_prediction);

        let mut required_bar = self.config.min_improvement_pct * modulation.threshold_multiplier;
        if ix_analyzer::is_small_workload(features.query_count, self.config.small_workload_threshold) {
            required_bar *= self.config.small_workload_reduction_factor;
        }
        if self.config.test_mode {
            required_bar *= self.config.test_mode_threshold_reduction;
        }

        if constraint_enabled {
            match constraint::evaluate(&constraint_input, &self.config.constraint_caps) {
                ConstraintOutcome::Vetoed { reason } => {
                    rationale.constraint_result = Some(false);
                    return Self::reject(candidate, rationale, "constraint_optimizer", &reason);
                },
                ConstraintOutcome::Satisfied { score } => {
                    rationale.constraint_result = Some(true);
                    combined += score * weights.constraint;
                },
            }
        }

        let approved = combined >= required_bar;
        let explanation = if approved {
            format!(
                "approved: combined score {combined:.3} >= required bar {required_bar:.3} ({} workload)",
                features.workload_class
            )
        } else {
            format!(
                "rejected: combined score {combined:.3} below required bar {required_bar:.3} ({} workload)",
                features.workload_class
            )
        };
        rationale.gate_outcomes.push(GateOutcome {
            gate: "decision_layers".to_owned(),
            admitted: approved,
            reason: explanation.clone(),
        });
        Decision {
            candidate,
            approved,
            rationale,
            explanation,
        }
    }

    /// Re-trains the utility predictor against `(features, improvement)`
    /// pairs reconstructed from lineage history by the caller (`ix-lifecycle`
    /// task 14, bounded time budget).
    pub fn retrain_utility(&mut self, history: &[(Features, f64)]) {
        self.utility.train_one_epoch(history);
    }
}

#[cfg(test)]
mod tests {
    use ix_config::DecisionConfig;
    use ix_domain::{
        IndexKind,
        Scope,
        TableSizeBucket,
    };

    use super::*;

    fn candidate() -> IndexCandidate {
        IndexCandidate {
            scope: Scope::new(Some("t1"), "contacts"),
            columns: vec!["tenant_id".into(), "email".into()],
            kind: IndexKind::Btree,
            predicate: None,
            include: vec![],
        }
    }

    fn features(sustained: bool, spike_ratio: f64, selectivity: f64, query_count: u64) -> Features {
        Features {
            selectivity,
            estimated_rows_without_index: 2000.0,
            write_frequency: 5.0,
            table_size_bucket: TableSizeBucket::Medium,
            workload_class: WorkloadClass::Balanced,
            sustained,
            spike_ratio,
            query_count,
            kind: IndexKind::Btree,
        }
    }

    fn open_signals() -> EarlyExitSignals {
        EarlyExitSignals {
            active_equivalent_exists: false,
            write_monitor_flagged: false,
            rate_limit_exceeded: false,
            outside_maintenance_window: false,
            per_table_index_count_cap_reached: false,
            query_volume_threshold: 500,
        }
    }

    fn open_constraint_input() -> ConstraintInput {
        ConstraintInput {
            tenant_storage_bytes_used: 0,
            estimated_new_index_bytes: 1_000,
            current_table_index_count: 1,
            predicted_write_overhead_pct: 2.0,
            predicted_improvement: 0.5,
            min_improvement_floor: 0.0,
        }
    }

    #[test]
    fn sustained_selective_pattern_is_approved() {
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.evaluate(
            candidate(),
            features(true, 0.1, 0.95, 2000),
            open_signals(),
            open_constraint_input(),
            true,
        );
        assert!(decision.approved, "{:?}", decision.rationale);
    }

    #[test]
    fn spike_only_pattern_is_rejected_before_layers_run() {
        let engine = DecisionEngine::new(DecisionConfig::default());
        let decision = engine.evaluate(
            candidate(),
            features(false, 0.9, 0.95, 2000),
            open_signals(),
            open_constraint_input(),
            true,
        );
        assert!(!decision.approved);
        assert!(decision.rationale.spike);
        assert!(decision.rationale.heuristic_score.is_none(), "layers should not have run");
    }

    #[test]
    fn active_equivalent_index_short_circuits_first() {
        let engine = DecisionEngine::new(DecisionConfig::default());
        let mut signals = open_signals();
        signals.active_equivalent_exists = true;
        signals.write_monitor_flagged = true; // would also reject, but (a) must win
        let decision = engine.evaluate(candidate(), features(true, 0.1, 0.95, 2000), signals, open_constraint_input(), true);
        assert_eq!(decision.rationale.gate_outcomes[0].gate, "equivalent_index");
    }

    #[test]
    fn constraint_veto_overrides_a_positive_combined_score() {
        let engine = DecisionEngine::new(DecisionConfig::default());
        let mut constraint_input = open_constraint_input();
        constraint_input.current_table_index_count = 999;
        let decision = engine.evaluate(candidate(), features(true, 0.1, 0.95, 2000), open_signals(), constraint_input, true);
        assert!(!decision.approved);
        assert_eq!(decision.rationale.constraint_result, Some(false));
    }

    #[test]
    fn write_heavy_modulation_raises_the_bar_enough_to_flip_a_marginal_candidate() {
        let engine = DecisionEngine::new(DecisionConfig::default());
        let mut marginal = features(true, 0.2, 0.5, 600);
        marginal.workload_class = WorkloadClass::Balanced;
        let balanced = engine.evaluate(candidate(), marginal, open_signals(), open_constraint_input(), true);

        let mut write_heavy = features(true, 0.2, 0.5, 600);
        write_heavy.workload_class = WorkloadClass::WriteHeavy;
        let write_heavy_decision = engine.evaluate(candidate(), write_heavy, open_signals(), open_constraint_input(), true);

        assert_eq!(write_heavy_decision.rationale.workload_class, Some(WorkloadClass::WriteHeavy));
        // Both may or may not approve depending on exact scores, but the
        // write-heavy combined score must never exceed the balanced one.
        assert!(write_heavy_decision.rationale.confidence.unwrap() <= balanced.rationale.confidence.unwrap() + 1e-9);
    }

    #[test]
    fn small_workload_reduces_the_required_bar() {
        let mut config = DecisionConfig::default();
        config.small_workload_threshold = 10_000;
        config.small_workload_reduction_factor = 0.2;
        config.min_improvement_pct = 0.9; // deliberately high to see the reduction matter
        let engine = DecisionEngine::new(config);
        let decision = engine.evaluate(candidate(), features(true, 0.1, 0.9, 2000), open_signals(), open_constraint_input(), true);
        // query_count=2000 < small_workload_threshold=10000, so the bar is
        // reduced to 0.9*0.2=0.18, which a strong candidate clears even
        // though the un-reduced bar of 0.9 would not be clearable.
        assert!(decision.approved);
    }
}
