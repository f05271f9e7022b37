//! Task 14, optional ML model retraining. `ix-decision`'s
//! `DecisionEngine::retrain_utility` already exists for the same purpose
//! against C6's utility predictor (see its doc comment); this module
//! supplies both retraining paths with `(Features, improvement)` training
//! pairs reconstructed from lineage, since `MutationEvent`/`DecisionRationale`
//! persist only the scores a decision produced, not the raw `Features` that
//! produced them.
//!
//! The reconstruction is necessarily lossy: `selectivity` is approximated
//! from the recorded `heuristic_score` (the heuristic layer weighs
//! selectivity most heavily, so it is the closest available proxy),
//! `write_frequency` from the recorded `workload_class` bucket, and
//! `sustained`/`spike_ratio` from the recorded `spike` flag. Fields
//! `vectorize` in `ix-decision::utility` never reads — `table_size_bucket`,
//! `query_count`, `kind` — are filled with neutral defaults since no
//! real-weight field uses them to begin with. An event with no
//! `workload_class` or no `improvement` recorded can't be reconstructed at
//! all and is skipped.
//!
//! `ix-interceptor`'s own risk scorer (C10) is deliberately not retrained
//! from here: its decisions never touch lineage, so there
//! is no `MutationEvent` history to reconstruct features from in the first
//! place. It retrains incrementally instead, folding each
//! `QueryInterceptor::record_outcome` call straight into its scorer as the
//! feedback loop runs, which needs no bounded-time periodic tick of its own.

use std::time::{
    Duration,
    Instant,
};

use ix_decision::{
    DecisionEngine,
    Features,
};
use ix_domain::{
    IndexKind,
    MutationEvent,
    TableSizeBucket,
    WorkloadClass,
};

fn write_frequency_for(class: WorkloadClass) -> f64 {
    match class {
        WorkloadClass::ReadHeavy => 5.0,
        WorkloadClass::Balanced => 50.0,
        WorkloadClass::WriteHeavy => 500.0,
    }
}

/// Reconstructs an approximate `Features` for `event`, or `None` if it
/// lacks the minimum the reconstruction needs (`workload_class` and
/// `improvement`).
pub fn reconstruct_features(event: &MutationEvent) -> Option<(Features, f64)> {
    let workload_class = event.rationale.workload_class?;
    let improvement = event.improvement?;
    let selectivity = event.rationale.heuristic_score.unwrap_or(0.5).clamp(0.0, 1.0);
    let sustained = !event.rationale.spike;
    let spike_ratio = if event.rationale.spike { 0.9 } else { 0.1 };
    let features = Features {
        selectivity,
        estimated_rows_without_index: 5_000.0,
        write_frequency: write_frequency_for(workload_class),
        table_size_bucket: TableSizeBucket::Medium,
        workload_class,
        sustained,
        spike_ratio,
        query_count: 2_000,
        kind: IndexKind::Btree,
    };
    Some((features, improvement))
}

/// Folds `events` into `(Features, improvement)` pairs, stopping early once
/// `deadline` passes — the tick this runs inside must still complete its
/// remaining tasks, so a slow history scan is truncated rather than let it
/// delay them.
pub fn training_pairs(events: &[MutationEvent], deadline: Instant) -> Vec<(Features, f64)> {
    let mut pairs = Vec::with_capacity(events.len());
    for event in events {
        if Instant::now() >= deadline {
            break;
        }
        if let Some(pair) = reconstruct_features(event) {
            pairs.push(pair);
        }
    }
    pairs
}

/// Retrains `engine`'s utility predictor against `history`, bounded by
/// `time_budget`. Returns the number of pairs actually folded in, for the
/// tick's log line.
pub fn retrain_utility_engine(engine: &mut DecisionEngine, history: &[MutationEvent], time_budget: Duration) -> usize {
    let deadline = Instant::now() + time_budget;
    let pairs = training_pairs(history, deadline);
    let count = pairs.len();
    if !pairs.is_empty() {
        engine.retrain_utility(&pairs);
    }
    count
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::{
        Actor,
        DecisionRationale,
        MutationKind,
    };
    use uuid::Uuid;

    use super::*;

    fn event(workload_class: Option<WorkloadClass>, improvement: Option<f64>, spike: bool) -> MutationEvent {
        MutationEvent {
            id: Uuid::new_v4(),
            index_ref: Uuid::new_v4(),
            ts: Utc::now(),
            seq: 0,
            actor: Actor::Engine,
            kind: MutationKind::Created,
            rationale: DecisionRationale {
                workload_class,
                heuristic_score: Some(0.8),
                spike,
                ..Default::default()
            },
            before_summary: None,
            after_summary: None,
            improvement,
            explanation: "test".into(),
        }
    }

    #[test]
    fn an_event_with_no_workload_class_is_skipped() {
        assert!(reconstruct_features(&event(None, Some(0.5), false)).is_none());
    }

    #[test]
    fn an_event_with_no_improvement_is_skipped() {
        assert!(reconstruct_features(&event(Some(WorkloadClass::Balanced), None, false)).is_none());
    }

    #[test]
    fn a_complete_event_reconstructs_a_training_pair() {
        let (features, improvement) = reconstruct_features(&event(Some(WorkloadClass::WriteHeavy), Some(0.4), true)).unwrap();
        assert_eq!(improvement, 0.4);
        assert_eq!(features.workload_class, WorkloadClass::WriteHeavy);
        assert!(!features.sustained);
        assert_eq!(features.selectivity, 0.8);
    }

    #[test]
    fn an_expired_deadline_truncates_the_history_scan() {
        let events: Vec<_> = (0..5).map(|_| event(Some(WorkloadClass::Balanced), Some(0.5), false)).collect();
        let pairs = training_pairs(&events, Instant::now() - Duration::from_millis(1));
        assert!(pairs.is_empty());
    }

    #[test]
    fn retraining_folds_every_reconstructable_pair() {
        let mut engine = DecisionEngine::new(ix_config::DecisionConfig::default());
        let events = vec![
            event(Some(WorkloadClass::Balanced), Some(0.9), false),
            event(None, Some(0.9), false),
        ];
        let folded = retrain_utility_engine(&mut engine, &events, Duration::from_secs(1));
        assert_eq!(folded, 1);
    }
}
