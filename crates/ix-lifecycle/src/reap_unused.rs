//! Task 2, reap unused indexes: indexes with zero
//! scans over a configurable horizon, excluding uniqueness-enforcing ones.
//! Proposal-only unless `auto_cleanup` is enabled, matching `reap_invalid`'s
//! shape but gated by the config flag rather than always acting.

use chrono::{
    Duration,
    Utc,
};
use ix_executor::ddl;
use ix_gateway::GatewayConnection;
use ix_lineage::LineageStore;

#[derive(Debug, Clone, PartialEq)]
pub struct UnusedIndexCandidate {
    pub name: String,
    pub table: String,
    pub size_bytes: i64,
}

/// Indexes `pg_stat_user_indexes` reports zero scans for, excluding
/// uniqueness-enforcing ones (`pg_index.indisunique`), regardless of age:
/// Postgres only exposes a cumulative scan counter, not a last-used
/// timestamp, so `horizon` is applied against the table's last stats reset
/// rather than the index's own age.
pub async fn find_candidates(conn: &GatewayConnection<'_>, horizon: Duration) -> anyhow::Result<Vec<UnusedIndexCandidate>> {
    let cutoff = Utc::now() - horizon;
    let rows = conn
        .query(
            "select i.indexrelname, i.relname, pg_relation_size(i.indexrelid) \
             from pg_stat_user_indexes i \
             join pg_index ix on ix.indexrelid = i.indexrelid \
             join pg_stat_user_tables t on t.relid = i.relid \
             where i.idx_scan = 0 \
               and not ix.indisunique \
               and coalesce(t.stats_reset, 'epoch') < $1",
            &[&cutoff],
        )
        .await?;
    rows.into_iter()
        .map(|row| {
            Ok(UnusedIndexCandidate {
                name: row.try_get(0)?,
                table: row.try_get(1)?,
                size_bytes: row.try_get(2)?,
            })
        })
        .collect()
}

/// Drops every candidate (`CONCURRENTLY`) and records a `Dropped` lineage
/// event per index. Only called when `auto_cleanup` is enabled; otherwise
/// the caller just logs `find_candidates`' output as a proposal.
pub async fn drop_all(
    conn: &GatewayConnection<'_>,
    lineage: &LineageStore,
    candidates: &[UnusedIndexCandidate],
) -> anyhow::Result<usize> {
    let mut dropped = 0;
    for candidate in candidates {
        let sql = ddl::build_drop_index_sql(&candidate.name, true)?;
        if let Err(e) = conn.run_autocommit(&sql).await {
            tracing::warn!(index = candidate.name, "reap_unused: drop failed: {e:#}");
            continue;
        }
        dropped += 1;
        let event = super::maintainer_event(
            ix_domain::MutationKind::Dropped,
            format!("reaped unused index {} ({} bytes, zero scans)", candidate.name, candidate.size_bytes),
        );
        if let Err(e) = lineage.record_mutation(event, &candidate.table).await {
            tracing::warn!(index = candidate.name, "reap_unused: lineage write failed: {e:#}");
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    // `find_candidates`/`drop_all` need a live connection; covered by
    // `ix-lifecycle`'s integration tests against a fake gateway.
}
