//! The `analyze`/`apply` decision round. Every per-candidate building block — windowed aggregation
//! (`ix-analyzer`), scoring (`ix-decision`), gating and mutation
//! (`ix-safety`/`ix-executor`) — already exists as a pure or narrowly-scoped
//! function; this module is the glue that walks the catalog's tenant
//! activations (never the raw field universe, per invariant 5) and drives
//! one candidate at a time through them, the way `ix-lifecycle`'s tasks
//! drive their own narrower rounds.

use chrono::{
    Duration,
    Utc,
};
use ix_analyzer::FieldAnalysis;
use ix_decision::{
    ConstraintInput,
    EarlyExitSignals,
    Features,
};
use ix_domain::{
    Actor,
    IndexCandidate,
    IndexKind,
    MutationEvent,
    MutationKind,
    Scope,
    TableSizeBucket,
    WorkloadClass,
};
use ix_executor::ExecutionOutcome;
use ix_gateway::{
    identifier::Ident,
    ConnectionPool,
};
use uuid::Uuid;

use crate::supervisor::Supervisor;

/// One candidate's outcome for a round, returned to the CLI for printing.
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub scope: Scope,
    pub field: String,
    pub approved: bool,
    pub explanation: String,
    pub execution: Option<ExecutionOutcome>,
}

const MIN_SAMPLES_TO_CONSIDER: u64 = 10;
const WINDOW_HOURS: i64 = 24;

/// Runs one pass over every `TenantActivation` the catalog currently
/// carries: loads its windowed samples, analyzes the pattern, evaluates the
/// decision engine, and — only when `apply` is true — hands approved
/// candidates to the mutation executor. `analyze` (apply=false) never opens
/// a DDL-capable connection.
pub async fn run_round(supervisor: &Supervisor, apply: bool, emergency: bool) -> anyhow::Result<Vec<RoundResult>> {
    let snapshot = supervisor.catalog.snapshot();
    let mut results = Vec::new();

    let conn = supervisor.pool.acquire().await?;
    let live_records = ix_executor::record_store::list_active(&conn).await?;
    drop(conn);

    for activation in &snapshot.activations {
        let scope = Scope::new(Some(activation.tenant.clone()), activation.table.clone());
        if live_records
            .iter()
            .any(|r| r.scope == scope && r.columns == vec![activation.field.clone()] && r.status == ix_domain::IndexStatus::Active)
        {
            continue;
        }

        let window = Duration::hours(WINDOW_HOURS);
        let now = Utc::now();
        let conn = supervisor.pool.acquire().await?;
        let samples = ix_ingestion::load::load_window(&conn, Some(&activation.tenant), &activation.table, &activation.field, now, window).await?;
        let table_row_count = table_row_count(&conn, &activation.table).await.unwrap_or(0);
        let distinct = distinct_estimate(&conn, &activation.table, &activation.field, table_row_count).await;
        drop(conn);

        if (samples.len() as u64) < MIN_SAMPLES_TO_CONSIDER {
            continue;
        }

        let config = &supervisor.config.decision;
        let analysis: FieldAnalysis = ix_analyzer::analyze_field(
            &samples,
            Some(&activation.tenant),
            &activation.table,
            &activation.field,
            now,
            window,
            1, // already filtered to >= MIN_SAMPLES_TO_CONSIDER above
            0.5,
            distinct,
            None,
            table_row_count,
        );

        let candidate = IndexCandidate {
            scope: scope.clone(),
            columns: vec![activation.field.clone()],
            kind: IndexKind::Btree,
            predicate: None,
            include: vec![],
        };

        let features = Features {
            selectivity: analysis.selectivity,
            estimated_rows_without_index: analysis.usage.count as f64,
            write_frequency: analysis.usage.write_count as f64,
            table_size_bucket: TableSizeBucket::from_row_count(table_row_count, config.size_buckets.small_max_rows, config.size_buckets.medium_max_rows),
            workload_class: WorkloadClass::from_ratio(analysis.usage.read_write_ratio()),
            sustained: analysis.pattern.sustained,
            spike_ratio: analysis.pattern.spike_ratio,
            query_count: analysis.usage.count,
            kind: IndexKind::Btree,
        };

        let query_volume_threshold = match features.table_size_bucket {
            TableSizeBucket::Small => 100,
            TableSizeBucket::Medium => 500,
            TableSizeBucket::Large => 1_000,
        };
        let query_volume_threshold = if ix_analyzer::is_small_workload(features.query_count, config.small_workload_threshold) {
            (query_volume_threshold as f64 * config.small_workload_reduction_factor) as u64
        } else {
            query_volume_threshold
        };

        let signals = EarlyExitSignals {
            active_equivalent_exists: false, // already filtered above
            write_monitor_flagged: !supervisor.safety.write_latency.admits(&scope.key()),
            rate_limit_exceeded: false,
            outside_maintenance_window: !ix_safety::maintenance_window_admits(&supervisor.config.safety.maintenance_window, now, emergency),
            per_table_index_count_cap_reached: live_records.iter().filter(|r| r.scope.table == scope.table).count() as u32 >= config.constraint_caps.per_table_index_count,
            query_volume_threshold,
        };

        let tenant_index_names: Vec<String> = live_records
            .iter()
            .filter(|r| r.scope.tenant.as_deref() == Some(activation.tenant.as_str()))
            .map(|r| r.name.clone())
            .collect();
        let conn = supervisor.pool.acquire().await?;
        let tenant_storage_bytes_used = tenant_storage_bytes(&conn, &tenant_index_names).await.unwrap_or(0);
        drop(conn);

        let constraint_input = ConstraintInput {
            tenant_storage_bytes_used,
            estimated_new_index_bytes: table_row_count.saturating_mul(32),
            current_table_index_count: live_records.iter().filter(|r| r.scope.table == scope.table).count() as u32,
            predicted_write_overhead_pct: features.write_frequency * IndexKind::Btree.write_overhead_factor(),
            // No hypothetical-index plan estimate without the index actually
            // existing; selectivity is the same [0,1] quantity the analyzer
            // already uses as the plan-derived improvement proxy, so it doubles as the constraint floor's input here.
            predicted_improvement: analysis.selectivity,
            min_improvement_floor: config.min_improvement_pct,
        };

        // Locked only for the evaluation itself; never held across an `.await`.
        let decision_result = supervisor.decision.lock().evaluate(candidate.clone(), features, signals, constraint_input, true);

        if !apply || !decision_result.approved {
            if !decision_result.approved {
                record_rejection(supervisor, &scope, &decision_result).await;
            }
            results.push(RoundResult {
                scope,
                field: activation.field.clone(),
                approved: decision_result.approved,
                explanation: decision_result.explanation,
                execution: None,
            });
            continue;
        }

        let ident = Ident::new(&activation.field)?;
        let table_ident = Ident::new(&activation.table)?;
        let sample_sql = format!("select 1 from {} where {} is not null limit 1000", table_ident, ident);
        let cpu_pct = supervisor.cpu_sampler.sample_pct();

        let execution = supervisor
            .executor
            .execute(candidate, decision_result.rationale, &sample_sql, &[], cpu_pct, emergency, supervisor.config.executor.allow_blocking_ddl_fallback)
            .await?;

        results.push(RoundResult {
            scope,
            field: activation.field.clone(),
            approved: true,
            explanation: decision_result.explanation,
            execution: Some(execution),
        });
    }

    Ok(results)
}

async fn record_rejection(supervisor: &Supervisor, scope: &Scope, decision: &ix_decision::Decision) {
    let event = MutationEvent {
        id: Uuid::new_v4(),
        index_ref: Uuid::nil(),
        ts: Utc::now(),
        seq: 0,
        actor: Actor::Engine,
        kind: MutationKind::Rejected,
        rationale: decision.rationale.clone(),
        before_summary: None,
        after_summary: None,
        improvement: None,
        explanation: decision.explanation.clone(),
    };
    if let Err(e) = supervisor.lineage.record_mutation(event, &scope.key()).await {
        tracing::warn!(scope = %scope, "failed to record rejection in lineage: {e:#}");
    }
}

async fn table_row_count(conn: &ix_gateway::GatewayConnection<'_>, table: &str) -> anyhow::Result<u64> {
    let row = conn.query_opt("select reltuples::bigint as rows from pg_class where relname = $1", &[&table]).await?;
    Ok(row.and_then(|r| r.try_get::<_, i64>("rows").ok()).unwrap_or(0).max(0) as u64)
}

/// `n_distinct` from `pg_stats`, Postgres's own `ANALYZE`-sampled estimate —
/// distinct-count sampling when available, without a full-table scan. A
/// positive value is an absolute count; a
/// negative value is `-distinct/rows` (per `pg_stats` semantics).
async fn distinct_estimate(conn: &ix_gateway::GatewayConnection<'_>, table: &str, column: &str, row_count: u64) -> Option<(u64, u64)> {
    let row = conn
        .query_opt(
            "select n_distinct from pg_stats where schemaname = 'public' and tablename = $1 and attname = $2",
            &[&table, &column],
        )
        .await
        .ok()??;
    let n_distinct: f32 = row.try_get("n_distinct").ok()?;
    if row_count == 0 {
        return None;
    }
    let distinct = if n_distinct >= 0.0 {
        n_distinct as u64
    } else {
        ((-n_distinct as f64) * row_count as f64) as u64
    };
    Some((distinct.min(row_count), row_count))
}

/// Sums the on-disk size of every named index, the per-tenant storage figure
/// the constraint optimizer's cap compares against.
async fn tenant_storage_bytes(conn: &ix_gateway::GatewayConnection<'_>, index_names: &[String]) -> anyhow::Result<u64> {
    if index_names.is_empty() {
        return Ok(0);
    }
    let row = conn
        .query_opt(
            "select coalesce(sum(pg_total_relation_size(quote_ident(n)::regclass)), 0)::bigint as bytes \
             from unnest($1::text[]) as n",
            &[&index_names],
        )
        .await?;
    Ok(row.and_then(|r| r.try_get::<_, i64>("bytes").ok()).unwrap_or(0).max(0) as u64)
}

/// Forces the rollback of one `IndexRecord`, for the `rollback <index>` CLI
/// command.
pub async fn force_rollback(supervisor: &Supervisor, index_name: &str) -> anyhow::Result<ExecutionOutcome> {
    let conn = supervisor.pool.acquire().await?;
    let records = ix_executor::record_store::list_active(&conn).await?;
    drop(conn);
    let record = records
        .into_iter()
        .find(|r| r.name == index_name)
        .ok_or_else(|| anyhow::anyhow!("no active index record named {index_name}"))?;
    supervisor.executor.force_rollback(record).await
}

/// Exposed for `ix-daemon::main`'s `bootstrap` command, which needs a pool
/// before a full [`Supervisor`] can come up.
pub async fn bootstrap_only(pool: &std::sync::Arc<ConnectionPool>, config: &ix_config::Config) -> anyhow::Result<()> {
    let catalog = ix_catalog::Catalog::empty();
    catalog.bootstrap(&config.catalog, Some(pool), None).await?;
    tracing::info!(fields = catalog.snapshot().fields.len(), "catalog bootstrap complete");
    Ok(())
}
