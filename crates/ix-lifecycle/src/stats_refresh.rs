//! Refresh stale statistics: scans `pg_stat_user_tables` for relations whose
//! last-analyzed timestamp is older than the configured TTL and runs
//! `ANALYZE` on each. Relies on that view's `relname` column.

use chrono::{
    Duration,
    Utc,
};
use ix_gateway::{
    GatewayConnection,
    Ident,
};

pub async fn stale_relations(conn: &GatewayConnection<'_>, ttl: Duration) -> anyhow::Result<Vec<String>> {
    let cutoff = Utc::now() - ttl;
    let rows = conn
        .query(
            "select relname from pg_stat_user_tables \
             where greatest(coalesce(last_analyze, 'epoch'), coalesce(last_autoanalyze, 'epoch')) < $1",
            &[&cutoff],
        )
        .await?;
    rows.into_iter().map(|row| Ok(row.try_get::<_, String>(0)?)).collect()
}

pub async fn analyze_all(conn: &GatewayConnection<'_>, tables: &[String]) -> anyhow::Result<usize> {
    let mut analyzed = 0;
    for table in tables {
        let ident = Ident::new(table)?;
        if let Err(e) = conn.run_autocommit(&format!("analyze {ident}")).await {
            tracing::warn!(table, "stats_refresh: analyze failed: {e:#}");
            continue;
        }
        analyzed += 1;
    }
    Ok(analyzed)
}

#[cfg(test)]
mod tests {
    // Needs a live connection; covered by integration tests against a fake
    // gateway.
}
