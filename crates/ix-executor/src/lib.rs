//! Mutation executor. The sole writer of `IndexRecord`
//! transitions; every other component only reads
//! the live `IndexRecord` set this crate's caller maintains from
//! [`ExecutionOutcome`]s.
//!
//! DDL is serialized per scope two ways at once: an in-process
//! `ix_safety::LockAdvisor` (cheap, catches same-process races instantly)
//! and a Postgres advisory lock held across the same connection as the DDL
//! statement (catches cross-process races — two daemons, or a daemon racing
//! an operator's `apply`). Different scopes build concurrently, bounded by
//! [`concurrency::DdlConcurrencyLimiter`].

pub mod canary;
pub mod concurrency;
pub mod ddl;
pub mod record_store;
pub mod rollback;

use std::sync::Arc;

use chrono::Utc;
use concurrency::DdlConcurrencyLimiter;
use ix_domain::{
    Actor,
    DecisionRationale,
    IndexCandidate,
    IndexRecord,
    IndexStatus,
    MutationEvent,
    MutationKind,
};
use ix_gateway::{
    ConnectionPool,
    GatewayConnection,
};
use ix_lineage::LineageStore;
use ix_metrics::SafeguardCounters;
use ix_planner::PlanIntrospector;
use ix_safety::{
    lock_advisor_db,
    SafetyGates,
};
use tokio_postgres::types::ToSql;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// DDL succeeded and the measured improvement cleared the floor (or
    /// auto-rollback is disabled); the index stays active.
    Created { record: IndexRecord, improvement: Option<f64> },
    /// DDL succeeded but the measured improvement was below the configured
    /// floor with auto-rollback enabled, so the index was dropped again.
    RolledBack { record: IndexRecord, improvement: Option<f64> },
    /// The DDL statement itself failed.
    Failed { reason: String },
    /// Never reached the DDL statement: another attempt already holds the
    /// scope's lock.
    Skipped { reason: String },
}

pub struct MutationExecutor {
    pool: Arc<ConnectionPool>,
    planner: Arc<PlanIntrospector>,
    safety: Arc<SafetyGates>,
    lineage: Arc<LineageStore>,
    counters: Arc<SafeguardCounters>,
    ddl_concurrency: DdlConcurrencyLimiter,
    min_improvement_pct: f64,
    auto_rollback_enabled: bool,
    allow_blocking_ddl_fallback: bool,
}

impl MutationExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: Arc<ConnectionPool>,
        planner: Arc<PlanIntrospector>,
        safety: Arc<SafetyGates>,
        lineage: Arc<LineageStore>,
        counters: Arc<SafeguardCounters>,
        max_concurrent_ddl: usize,
        min_improvement_pct: f64,
        auto_rollback_enabled: bool,
        allow_blocking_ddl_fallback: bool,
    ) -> Self {
        Self {
            pool,
            planner,
            safety,
            lineage,
            counters,
            ddl_concurrency: DdlConcurrencyLimiter::new(max_concurrent_ddl),
            min_improvement_pct,
            auto_rollback_enabled,
            allow_blocking_ddl_fallback,
        }
    }

    /// Builds one approved `candidate`, end to end, through the six-step
    /// mutation sequence. `sample_sql`/`sample_params` is a representative query used
    /// for the before/after `planAnalyze` measurement. `current_cpu_pct` is
    /// sampled by the caller (`ix-observability` owns the real gauge);
    /// `emergency` bypasses the maintenance window for operator-triggered
    /// `apply`/`rollback` CLI calls.
    pub async fn execute(
        &self,
        candidate: IndexCandidate,
        rationale: DecisionRationale,
        sample_sql: &str,
        sample_params: &[&(dyn ToSql + Sync)],
        current_cpu_pct: f64,
        emergency: bool,
        window_admits_blocking_ddl: bool,
    ) -> anyhow::Result<ExecutionOutcome> {
        let scope_key = candidate.scope.key();

        if let Err(denial) = self.safety.check_all(&scope_key, &scope_key, current_cpu_pct, emergency, &self.counters) {
            return self.skip(&scope_key, denial.gate_name()).await;
        }

        if !self.safety.lock_advisor.try_acquire(&scope_key) {
            self.counters.record_deny("lock_advisor");
            return self.skip(&scope_key, "scope locked").await;
        }
        self.counters.record_admit("lock_advisor");

        let outcome = self.execute_scope_locked(&candidate, rationale, sample_sql, sample_params, &scope_key, window_admits_blocking_ddl).await;
        self.safety.lock_advisor.release(&scope_key);
        outcome
    }

    async fn execute_scope_locked(
        &self,
        candidate: &IndexCandidate,
        rationale: DecisionRationale,
        sample_sql: &str,
        sample_params: &[&(dyn ToSql + Sync)],
        scope_key: &str,
        window_admits_blocking_ddl: bool,
    ) -> anyhow::Result<ExecutionOutcome> {
        let _permit = self.ddl_concurrency.acquire().await?;
        let conn = self.pool.acquire().await?;

        if !lock_advisor_db::try_acquire(&conn, scope_key).await.unwrap_or(false) {
            self.counters.record_deny("lock_advisor");
            return self.skip(scope_key, "scope locked").await;
        }

        let outcome = self
            .build_and_measure(&conn, candidate, rationale, sample_sql, sample_params, scope_key, window_admits_blocking_ddl)
            .await;

        if let Err(e) = lock_advisor_db::release(&conn, scope_key).await {
            tracing::warn!(scope_key, "failed to release advisory lock: {e:#}");
        }
        outcome
    }

    async fn build_and_measure(
        &self,
        conn: &GatewayConnection<'_>,
        candidate: &IndexCandidate,
        rationale: DecisionRationale,
        sample_sql: &str,
        sample_params: &[&(dyn ToSql + Sync)],
        scope_key: &str,
        window_admits_blocking_ddl: bool,
    ) -> anyhow::Result<ExecutionOutcome> {
        let mut record = IndexRecord::proposed(candidate, Utc::now());
        record.transition(IndexStatus::Building)?;
        record_store::upsert(conn, &record).await?;

        let before = match self.planner.plan_analyze(sample_sql, sample_params).await {
            Ok(summary) => summary,
            Err(e) => {
                record.transition(IndexStatus::Failed)?;
                record_store::upsert(conn, &record).await?;
                return self.fail(scope_key, record.id, rationale, format!("could not capture before-plan: {e:#}")).await;
            },
        };

        let ddl_sql = ddl::build_create_index_sql(candidate, &record.name, true)?;
        if let Err(e) = conn.run_autocommit(&ddl_sql).await {
            if self.allow_blocking_ddl_fallback && window_admits_blocking_ddl {
                tracing::warn!(scope_key, "concurrent index build failed, falling back to blocking DDL: {e:#}");
                let blocking_sql = ddl::build_create_index_sql(candidate, &record.name, false)?;
                if let Err(e2) = conn.run_autocommit(&blocking_sql).await {
                    self.safety.circuit_breaker.record_failure(scope_key, &self.counters);
                    record.transition(IndexStatus::Failed)?;
                    record_store::upsert(conn, &record).await?;
                    return self.fail(scope_key, record.id, rationale, format!("blocking DDL also failed: {e2:#}")).await;
                }
            } else {
                self.safety.circuit_breaker.record_failure(scope_key, &self.counters);
                record.transition(IndexStatus::Failed)?;
                record_store::upsert(conn, &record).await?;
                return self.fail(scope_key, record.id, rationale, format!("CREATE INDEX CONCURRENTLY failed: {e:#}")).await;
            }
        }

        record.transition(IndexStatus::Active)?;
        record_store::upsert(conn, &record).await?;
        self.safety.circuit_breaker.record_success(scope_key, &self.counters);

        let before_cost = before.estimated_cost;
        let after = self.planner.plan_analyze(sample_sql, sample_params).await.ok();
        let improvement = after.as_ref().map(|after| before.improvement_over(after));

        let created_event = MutationEvent {
            id: Uuid::new_v4(),
            index_ref: record.id,
            ts: Utc::now(),
            seq: 0,
            actor: Actor::Engine,
            kind: MutationKind::Created,
            rationale,
            before_summary: Some(before),
            after_summary: after,
            improvement,
            explanation: match improvement {
                Some(i) => format!("built {} with measured improvement {i:.3}", record.name),
                None => format!("built {} but after-plan measurement was unavailable", record.name),
            },
        };
        self.lineage.record_mutation(created_event, scope_key).await?;

        let Some(improvement) = improvement else {
            return Ok(ExecutionOutcome::Created { record, improvement: None });
        };
        record.last_validated_improvement = Some(improvement);
        record_store::upsert(conn, &record).await?;

        if self.safety.canary_enabled() {
            return self.resolve_build_time_canary(conn, record, before_cost, improvement, scope_key).await;
        }

        if rollback::should_rollback(improvement, self.min_improvement_pct, self.auto_rollback_enabled) {
            self.rollback(conn, record, improvement, scope_key).await
        } else {
            if improvement < self.min_improvement_pct {
                tracing::warn!(scope_key, improvement, "index built below the improvement floor; auto-rollback is disabled");
            }
            Ok(ExecutionOutcome::Created { record, improvement: Some(improvement) })
        }
    }

    /// Registers the just-built index for canary evaluation and records its
    /// own before/after measurement as the first outcome. Resolved in-line
    /// rather than through [`Self::evaluate_canary`]: this runs while
    /// `execute` still holds the scope's advisory lock, and
    /// `evaluate_canary`'s rollback branch re-acquires it through
    /// `force_rollback`, which would self-deny. Further traffic is sampled
    /// and recorded by the supervisor's canary tick, outside this lock,
    /// which does go through `evaluate_canary`.
    async fn resolve_build_time_canary(
        &self,
        conn: &GatewayConnection<'_>,
        record: IndexRecord,
        baseline_cost: f64,
        improvement: f64,
        scope_key: &str,
    ) -> anyhow::Result<ExecutionOutcome> {
        self.safety.canary.start(scope_key, baseline_cost);
        let improved = improvement >= self.min_improvement_pct;
        self.safety.canary.record_outcome(scope_key, improved);

        match self.safety.canary.verdict(scope_key) {
            ix_safety::CanaryVerdict::Pending => Ok(ExecutionOutcome::Created { record, improvement: Some(improvement) }),
            ix_safety::CanaryVerdict::Promote => {
                self.finalize_canary_promotion(&record, scope_key).await?;
                Ok(ExecutionOutcome::Created { record, improvement: Some(improvement) })
            },
            ix_safety::CanaryVerdict::Rollback => {
                self.safety.canary.reset(scope_key);
                self.rollback(conn, record, improvement, scope_key).await
            },
        }
    }

    /// Drops a just-built index whose measured improvement missed the
    /// floor. Best-effort: rollback must complete within a bounded time even
    /// if the database rejects the DROP, so on repeated failure this
    /// records an `Interrupted` event and leaves the record `Active`;
    /// `ix-lifecycle`'s reap task retries on the next tick.
    async fn rollback(
        &self,
        conn: &GatewayConnection<'_>,
        mut record: IndexRecord,
        improvement: f64,
        scope_key: &str,
    ) -> anyhow::Result<ExecutionOutcome> {
        let drop_sql = ddl::build_drop_index_sql(&record.name, true)?;
        match conn.run_autocommit(&drop_sql).await {
            Ok(()) => {
                record.transition(IndexStatus::RolledBack)?;
                record_store::upsert(conn, &record).await?;
                let event = MutationEvent {
                    id: Uuid::new_v4(),
                    index_ref: record.id,
                    ts: Utc::now(),
                    seq: 0,
                    actor: Actor::Engine,
                    kind: MutationKind::RolledBack,
                    rationale: DecisionRationale::default(),
                    before_summary: None,
                    after_summary: None,
                    improvement: Some(improvement),
                    explanation: format!("rolled back {}: improvement {improvement:.3} below floor", record.name),
                };
                self.lineage.record_mutation(event, scope_key).await?;
                Ok(ExecutionOutcome::RolledBack { record, improvement: Some(improvement) })
            },
            Err(e) => {
                tracing::error!(scope_key, index = record.name, "rollback DROP failed, will retry on next maintenance tick: {e:#}");
                let event = MutationEvent {
                    id: Uuid::new_v4(),
                    index_ref: record.id,
                    ts: Utc::now(),
                    seq: 0,
                    actor: Actor::Engine,
                    kind: MutationKind::Interrupted,
                    rationale: DecisionRationale::default(),
                    before_summary: None,
                    after_summary: None,
                    improvement: Some(improvement),
                    explanation: format!("rollback of {} requested but DROP failed: {e:#}", record.name),
                };
                self.lineage.record_mutation(event, scope_key).await?;
                Ok(ExecutionOutcome::Created { record, improvement: Some(improvement) })
            },
        }
    }

    /// Force-rollback of an already-active index, for the `rollback
    /// <index>` CLI command, `ix-lifecycle` retrying a
    /// previously interrupted drop, and canary rollback (`canary.rs`).
    pub async fn force_rollback(&self, record: IndexRecord) -> anyhow::Result<ExecutionOutcome> {
        let scope_key = record.scope.key();
        if !self.safety.lock_advisor.try_acquire(&scope_key) {
            return self.skip(&scope_key, "scope locked").await;
        }
        let _permit = self.ddl_concurrency.acquire().await?;
        let conn = self.pool.acquire().await?;
        let outcome = self.rollback(&conn, record, 0.0, &scope_key).await;
        self.safety.lock_advisor.release(&scope_key);
        outcome
    }

    async fn skip(&self, scope_key: &str, reason: &str) -> anyhow::Result<ExecutionOutcome> {
        let event = MutationEvent {
            id: Uuid::new_v4(),
            index_ref: Uuid::nil(),
            ts: Utc::now(),
            seq: 0,
            actor: Actor::Engine,
            kind: MutationKind::Skipped,
            rationale: DecisionRationale::default(),
            before_summary: None,
            after_summary: None,
            improvement: None,
            explanation: reason.to_owned(),
        };
        let _ = self.lineage.record_mutation(event, scope_key).await;
        Ok(ExecutionOutcome::Skipped { reason: reason.to_owned() })
    }

    async fn fail(
        &self,
        scope_key: &str,
        index_ref: Uuid,
        rationale: DecisionRationale,
        reason: String,
    ) -> anyhow::Result<ExecutionOutcome> {
        let event = MutationEvent {
            id: Uuid::new_v4(),
            index_ref,
            ts: Utc::now(),
            seq: 0,
            actor: Actor::Engine,
            kind: MutationKind::Failed,
            rationale,
            before_summary: None,
            after_summary: None,
            improvement: None,
            explanation: reason.clone(),
        };
        let _ = self.lineage.record_mutation(event, scope_key).await;
        Ok(ExecutionOutcome::Failed { reason })
    }

    /// Exposes the canary tracker and lineage store to `canary.rs` without
    /// widening either field's visibility outside this crate.
    pub(crate) fn safety(&self) -> &SafetyGates {
        &self.safety
    }

    pub(crate) fn lineage(&self) -> &LineageStore {
        &self.lineage
    }
}

#[cfg(test)]
mod tests {
    use ix_domain::{
        IndexKind,
        Scope,
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

    // `MutationExecutor` requires a live `ConnectionPool`/`PlanIntrospector`
    // to construct, so the end-to-end `execute` flow is exercised in integration tests against a fake
    // gateway; `ddl`, `rollback` and `canary`'s pure logic is unit-tested in
    // their own modules.
    #[test]
    fn candidate_fixture_builds_a_stable_name() {
        assert_eq!(candidate().canonical_name(), "ixp_t1_contacts_tenant_id_email");
    }
}
