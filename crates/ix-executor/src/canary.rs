//! S5 canary promotion/rollback glue: once
//! `ix-safety::CanaryTracker` has accumulated enough outcomes for a scope,
//! turns the verdict into a lineage event and, on rollback, an actual DROP.

use chrono::Utc;
use ix_domain::{
    Actor,
    DecisionRationale,
    IndexRecord,
    MutationEvent,
    MutationKind,
};
use ix_safety::CanaryVerdict;
use uuid::Uuid;

use crate::{
    ExecutionOutcome,
    MutationExecutor,
};

impl MutationExecutor {
    /// Checks the canary tracker for `record`'s scope. Returns `Ok(None)`
    /// while the verdict is still [`CanaryVerdict::Pending`]; callers are
    /// expected to poll this after each canary-traffic outcome is recorded
    /// via `safety().canary.record_outcome`.
    ///
    /// Called from outside the scope's advisory lock (the supervisor's
    /// periodic canary tick via [`Self::record_canary_traffic`]); the
    /// rollback branch goes through [`Self::force_rollback`], which acquires
    /// that lock itself. The build path's own initial outcome resolves
    /// in-line in `build_and_measure` instead, since it already holds the
    /// lock and re-entering it here would self-deny.
    pub async fn evaluate_canary(&self, record: IndexRecord) -> anyhow::Result<Option<ExecutionOutcome>> {
        let scope_key = record.scope.key();
        match self.safety().canary.verdict(&scope_key) {
            CanaryVerdict::Pending => Ok(None),
            CanaryVerdict::Promote => {
                self.finalize_canary_promotion(&record, &scope_key).await?;
                Ok(Some(ExecutionOutcome::Created { record, improvement: None }))
            },
            CanaryVerdict::Rollback => {
                self.safety().canary.reset(&scope_key);
                self.force_rollback(record).await.map(Some)
            },
        }
    }

    /// Records one canary-traffic outcome sampled outside an active build —
    /// the supervisor's periodic tick, gated on `canary_pct` — then polls
    /// for a verdict. Gives both `record_outcome` and `evaluate_canary` a
    /// caller distinct from the build path's in-line first outcome.
    pub async fn record_canary_traffic(&self, record: IndexRecord, improved: bool) -> anyhow::Result<Option<ExecutionOutcome>> {
        let scope_key = record.scope.key();
        self.safety().canary.record_outcome(&scope_key, improved);
        self.evaluate_canary(record).await
    }

    pub(crate) async fn finalize_canary_promotion(&self, record: &IndexRecord, scope_key: &str) -> anyhow::Result<()> {
        self.safety().canary.reset(scope_key);
        let event = MutationEvent {
            id: Uuid::new_v4(),
            index_ref: record.id,
            ts: Utc::now(),
            seq: 0,
            actor: Actor::Engine,
            kind: MutationKind::Promoted,
            rationale: DecisionRationale::default(),
            before_summary: None,
            after_summary: None,
            improvement: None,
            explanation: format!("canary promoted {}", record.name),
        };
        self.lineage().record_mutation(event, scope_key).await?;
        Ok(())
    }
}

// `evaluate_canary` needs a live `MutationExecutor`, so its branching is
// exercised in integration tests against a fake gateway; the verdict
// thresholds themselves are unit-tested in `ix-safety::canary`.
