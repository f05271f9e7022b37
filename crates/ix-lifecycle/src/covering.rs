//! Task 9, covering-index opportunities: active indexes whose scans still hit the heap
//! are candidates for an `INCLUDE` list. `pg_statio_user_indexes` exposes
//! `idx_blks_hit`/`idx_blks_read` but not heap fetches avoided, so the
//! signal used here is the table's own `heap_blks_hit`/`heap_blks_read`
//! relative to its index scan volume: a table scanned almost exclusively
//! through one index yet still doing heavy heap I/O is not benefiting from
//! an index-only scan. The candidate `INCLUDE` columns come from the
//! table's own non-key columns, via `ix_analyzer::covering::suggest`.

use ix_analyzer::covering::suggest;
use ix_domain::{
    IndexKind,
    IndexRecord,
    IndexStatus,
};
use ix_gateway::GatewayConnection;

pub use ix_analyzer::CoveringOpportunity;

const HEAP_FETCH_RATIO_THRESHOLD: f64 = 0.2;
const MAX_INCLUDE_COLUMNS: usize = 3;

async fn table_columns(conn: &GatewayConnection<'_>, table: &str) -> anyhow::Result<Vec<String>> {
    let rows = conn
        .query(
            "select column_name from information_schema.columns \
             where table_schema = 'public' and table_name = $1 order by ordinal_position",
            &[&table],
        )
        .await?;
    rows.into_iter().map(|row| Ok(row.try_get::<_, String>(0)?)).collect()
}

async fn heap_fetch_ratio(conn: &GatewayConnection<'_>, table: &str) -> anyhow::Result<f64> {
    let row = conn
        .query_opt(
            "select heap_blks_read, heap_blks_hit from pg_statio_user_tables where relname = $1",
            &[&table],
        )
        .await?;
    let Some(row) = row else { return Ok(0.0) };
    let read: i64 = row.try_get(0)?;
    let hit: i64 = row.try_get(1)?;
    let total = read + hit;
    if total == 0 {
        return Ok(0.0);
    }
    Ok(read as f64 / total as f64)
}

pub async fn detect(conn: &GatewayConnection<'_>, live_records: &[IndexRecord]) -> anyhow::Result<Vec<CoveringOpportunity>> {
    let mut opportunities = Vec::new();
    for record in live_records {
        if record.status != IndexStatus::Active || record.kind != IndexKind::Btree || !record.include.is_empty() {
            continue;
        }
        let ratio = heap_fetch_ratio(conn, &record.scope.table).await?;
        if ratio < HEAP_FETCH_RATIO_THRESHOLD {
            continue;
        }
        let mut columns = table_columns(conn, &record.scope.table).await?;
        columns.truncate(record.columns.len() + MAX_INCLUDE_COLUMNS);
        if let Some(opportunity) = suggest(&record.columns, &columns) {
            opportunities.push(opportunity);
        }
    }
    Ok(opportunities)
}

#[cfg(test)]
mod tests {
    // `detect` needs a live connection for both introspection queries;
    // covered by integration tests against a fake gateway. The pure
    // superset/include-list logic it delegates to is unit-tested in
    // `ix-analyzer::covering`.
}
