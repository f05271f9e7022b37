//! Lifecycle maintainer.
//!
//! A periodic scheduler (`scheduler`) runs the fourteen maintenance tasks in
//! three tiers — light (hourly), standard (daily) and heavy (weekly/monthly)
//! — each tier a superset of the one before it. Every task either queries
//! catalog/stat views directly or delegates to `ix-analyzer`'s pure
//! detectors; anything that mutates issues DDL through `ix-executor::ddl`
//! and writes its own lineage event here rather than through
//! `ix-executor::MutationExecutor`, since most of these tasks act on
//! indexes this process never decided on in the first place (no
//! `IndexCandidate`/`DecisionRationale` exists for "reap this orphan").

pub mod bloat;
pub mod consolidation;
pub mod covering;
pub mod fk_suggestions;
pub mod integrity;
pub mod predictive;
pub mod reap_invalid;
pub mod reap_unused;
pub mod redundant;
pub mod retrain;
pub mod safeguard_snapshot;
pub mod scheduler;
pub mod stale_locks;
pub mod stats_refresh;
pub mod workload_analysis;

use std::sync::Arc;

use chrono::Utc;
use ix_config::LifecycleConfig;
use ix_domain::{
    Actor,
    DecisionRationale,
    MutationEvent,
    MutationKind,
};
use ix_gateway::ConnectionPool;
use ix_lineage::LineageStore;
use ix_safety::SafetyGates;
use uuid::Uuid;

/// Builds a lineage event for a task that acts without a candidate decision
/// behind it: `index_ref` is nil since there is no `IndexRecord` id to
/// attach to (the index this task touches may not even be one this process
/// ever proposed), and `rationale` carries none of the C6 scoring fields.
pub(crate) fn maintainer_event(kind: MutationKind, explanation: String) -> MutationEvent {
    MutationEvent {
        id: Uuid::new_v4(),
        index_ref: Uuid::nil(),
        ts: Utc::now(),
        seq: 0,
        actor: Actor::Maintainer,
        kind,
        rationale: DecisionRationale::default(),
        before_summary: None,
        after_summary: None,
        improvement: None,
        explanation,
    }
}

/// One run's worth of task outcomes, returned by [`LifecycleMaintainer`]'s
/// tier methods for logging and the `lifecycle` CLI subcommand's summary
/// output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierReport {
    pub integrity_clean: Option<bool>,
    pub stale_locks_expired: Option<usize>,
    pub unused_reaped: Option<usize>,
    pub invalid_reaped: Option<usize>,
    pub bloated_reindexed: Option<usize>,
    pub stats_refreshed: Option<usize>,
    pub redundant_found: Option<usize>,
    pub consolidation_opportunities: Option<usize>,
    pub covering_opportunities: Option<usize>,
    pub fk_suggestions: Option<usize>,
}

/// Aggregates every dependency the fourteen tasks need and exposes one
/// method per tier. Holds no task-specific state of its own; all state
/// lives in the database or in the shared `SafetyGates`/`LineageStore` this
/// process already constructed for C7/C11.
pub struct LifecycleMaintainer {
    pool: Arc<ConnectionPool>,
    lineage: Arc<LineageStore>,
    safety: Arc<SafetyGates>,
    config: LifecycleConfig,
}

impl LifecycleMaintainer {
    pub fn new(pool: Arc<ConnectionPool>, lineage: Arc<LineageStore>, safety: Arc<SafetyGates>, config: LifecycleConfig) -> Self {
        Self {
            pool,
            lineage,
            safety,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Hourly tier: the cheap, purely structural checks. Safeguard snapshotting is handled by the
    /// caller reading `ix-metrics::SafeguardCounters` directly; nothing here
    /// issues DDL, so no admission check is needed.
    pub async fn run_light(&self, live_records: &[ix_domain::IndexRecord]) -> anyhow::Result<TierReport> {
        let conn = self.pool.acquire().await?;
        let integrity = integrity::check(&conn, live_records).await?;
        if !integrity.is_clean() {
            tracing::warn!(?integrity, "lifecycle: integrity check found drift");
        }
        let expired = stale_locks::expire(&self.safety.lock_advisor);
        Ok(TierReport {
            integrity_clean: Some(integrity.is_clean()),
            stale_locks_expired: Some(expired),
            ..Default::default()
        })
    }

    /// Daily tier: runs everything `run_light` does plus tasks 2, 3, 5, 6,
    /// 10, 11. Mutating subtasks are gated on
    /// `current_cpu_pct`/`emergency` via `SafetyGates::check_all` under a
    /// fixed `"lifecycle"` scope key, since these tasks act fleet-wide
    /// rather than against one table.
    pub async fn run_standard(&self, live_records: &[ix_domain::IndexRecord], current_cpu_pct: f64) -> anyhow::Result<TierReport> {
        let mut report = self.run_light(live_records).await?;
        let conn = self.pool.acquire().await?;
        let counters = ix_metrics::SafeguardCounters::new();
        let admitted = self.safety.check_all("lifecycle", "lifecycle", current_cpu_pct, false, &counters).is_ok();

        let unused = reap_unused::find_candidates(&conn, chrono::Duration::days(self.config.unused_index_horizon_days as i64)).await?;
        let unused_reaped = if self.config.auto_cleanup && admitted {
            reap_unused::drop_all(&conn, &self.lineage, &unused).await?
        } else {
            if !unused.is_empty() {
                tracing::info!(count = unused.len(), "lifecycle: unused index candidates (auto_cleanup disabled or gate denied)");
            }
            0
        };
        report.unused_reaped = Some(unused_reaped);

        report.invalid_reaped = Some(reap_invalid::reap(&conn, &self.lineage).await?);

        let bloated = bloat::find_bloated(&conn, self.config.bloat_threshold_pct, self.config.bloat_min_size_bytes as i64).await?;
        report.bloated_reindexed = Some(bloat::reindex_all(&conn, &self.lineage, &bloated, self.config.auto_reindex, admitted).await?);

        let stale_tables = stats_refresh::stale_relations(&conn, chrono::Duration::hours(self.config.stats_staleness_ttl_hours as i64)).await?;
        report.stats_refreshed = Some(stats_refresh::analyze_all(&conn, &stale_tables).await?);

        let workload = workload_analysis::classify_all(&conn).await?;
        let fk_candidates = fk_suggestions::find_missing(&conn, &workload).await?;
        report.fk_suggestions = Some(fk_candidates.len());
        for suggestion in &fk_candidates {
            tracing::info!(?suggestion, "lifecycle: foreign-key index suggestion");
        }

        Ok(report)
    }

    /// Weekly/monthly tier: runs everything `run_standard` does plus the
    /// structural-overlap tasks (redundant-index detection, consolidation,
    /// covering-index opportunities), which are expensive enough (pairwise
    /// comparison across a table's full index set) to reserve for the
    /// infrequent tier.
    pub async fn run_heavy(&self, live_records: &[ix_domain::IndexRecord], current_cpu_pct: f64) -> anyhow::Result<TierReport> {
        let mut report = self.run_standard(live_records, current_cpu_pct).await?;

        let redundant = redundant::detect(live_records);
        report.redundant_found = Some(redundant.len());
        for pair in &redundant {
            tracing::info!(?pair, "lifecycle: redundant index pair");
        }

        if self.config.consolidation_enabled {
            let opportunities = consolidation::detect(live_records);
            report.consolidation_opportunities = Some(opportunities.len());
            for opportunity in &opportunities {
                tracing::info!(?opportunity, "lifecycle: consolidation opportunity");
            }
        }

        if self.config.covering_index_analysis_enabled {
            let conn = self.pool.acquire().await?;
            let opportunities = covering::detect(&conn, live_records).await?;
            report.covering_opportunities = Some(opportunities.len());
            for opportunity in &opportunities {
                tracing::info!(?opportunity, "lifecycle: covering-index opportunity");
            }
        }

        Ok(report)
    }

    /// Task 14: retrains `engine`'s utility
    /// predictor against the most recent `history_limit` lineage events
    /// that recorded an improvement, bounded by `config.retrain_time_budget_ms`.
    /// Takes the engine by reference rather than owning one itself — C6's
    /// engine is shared with the live decision path, so `ix-daemon` holds it
    /// behind whatever synchronization its supervisor uses and only calls
    /// in here during a tick.
    pub async fn retrain_utility(&self, engine: &mut ix_decision::DecisionEngine, history_limit: i64) -> anyhow::Result<usize> {
        let history = self.lineage.recent_with_improvement(history_limit).await?;
        Ok(retrain::retrain_utility_engine(
            engine,
            &history,
            std::time::Duration::from_millis(self.config.retrain_time_budget_ms),
        ))
    }
}
