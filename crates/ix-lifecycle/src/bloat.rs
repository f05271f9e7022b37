//! Task 5, bloat detection: uses the `pgstattuple`
//! extension's `pgstatindex` to estimate per-index bloat from leaf page
//! density, the standard way Postgres operators measure index bloat without
//! a full `VACUUM`/`REINDEX` dry run. Guarded by CPU throttle and
//! maintenance window; reindexing itself goes through
//! `ix_executor::ddl::build_reindex_concurrently_sql`.

use ix_executor::ddl;
use ix_gateway::GatewayConnection;
use ix_lineage::LineageStore;

#[derive(Debug, Clone, PartialEq)]
pub struct BloatedIndex {
    pub name: String,
    pub table: String,
    pub size_bytes: i64,
    pub bloat_pct: f64,
}

pub async fn find_bloated(
    conn: &GatewayConnection<'_>,
    bloat_threshold_pct: f64,
    min_size_bytes: i64,
) -> anyhow::Result<Vec<BloatedIndex>> {
    let rows = conn
        .query(
            "select i.indexrelname, i.relname, pg_relation_size(i.indexrelid), \
                    100 - (s.avg_leaf_density) \
             from pg_stat_user_indexes i \
             cross join lateral pgstatindex(i.indexrelid::regclass::text) s \
             where pg_relation_size(i.indexrelid) >= $1 \
               and 100 - (s.avg_leaf_density) >= $2",
            &[&min_size_bytes, &bloat_threshold_pct],
        )
        .await?;
    rows.into_iter()
        .map(|row| {
            Ok(BloatedIndex {
                name: row.try_get(0)?,
                table: row.try_get(1)?,
                size_bytes: row.try_get(2)?,
                bloat_pct: row.try_get(3)?,
            })
        })
        .collect()
}

/// Reindexes every bloated index found, only when `admitted` (the caller
/// has already checked CPU throttle and maintenance window) and
/// `auto_reindex` is enabled.
pub async fn reindex_all(
    conn: &GatewayConnection<'_>,
    lineage: &LineageStore,
    bloated: &[BloatedIndex],
    auto_reindex: bool,
    admitted: bool,
) -> anyhow::Result<usize> {
    if !auto_reindex || !admitted {
        return Ok(0);
    }
    let mut reindexed = 0;
    for index in bloated {
        let sql = ddl::build_reindex_concurrently_sql(&index.name)?;
        if let Err(e) = conn.run_autocommit(&sql).await {
            tracing::warn!(index = index.name, "bloat: reindex failed: {e:#}");
            continue;
        }
        reindexed += 1;
        let event = super::maintainer_event(
            ix_domain::MutationKind::Created,
            format!("reindexed {} ({:.1}% bloat, {} bytes)", index.name, index.bloat_pct, index.size_bytes),
        );
        if let Err(e) = lineage.record_mutation(event, &index.table).await {
            tracing::warn!(index = index.name, "bloat: lineage write failed: {e:#}");
        }
    }
    Ok(reindexed)
}

#[cfg(test)]
mod tests {
    // Needs both a live connection and the `pgstattuple` extension; covered
    // by integration tests against a fake gateway.
}
