//! Task 3, reap invalid indexes: a `CREATE INDEX
//! CONCURRENTLY` that failed partway through leaves `pg_index.indisvalid =
//! false` behind — unusable and only ever safe to drop, so this always
//! acts, unlike `reap_unused`'s `auto_cleanup` gate.

use ix_executor::ddl;
use ix_gateway::GatewayConnection;
use ix_lineage::LineageStore;

pub async fn reap(conn: &GatewayConnection<'_>, lineage: &LineageStore) -> anyhow::Result<usize> {
    let rows = conn
        .query(
            "select i.indexrelname, i.relname \
             from pg_stat_user_indexes i \
             join pg_index ix on ix.indexrelid = i.indexrelid \
             where not ix.indisvalid",
            &[],
        )
        .await?;

    let mut reaped = 0;
    for row in rows {
        let name: String = row.try_get(0)?;
        let table: String = row.try_get(1)?;
        let sql = ddl::build_drop_index_sql(&name, true)?;
        if let Err(e) = conn.run_autocommit(&sql).await {
            tracing::warn!(index = name, "reap_invalid: drop failed: {e:#}");
            continue;
        }
        reaped += 1;
        let event = super::maintainer_event(ix_domain::MutationKind::Dropped, format!("reaped invalid index {name} (creation failed mid-flight)"));
        if let Err(e) = lineage.record_mutation(event, &table).await {
            tracing::warn!(index = name, "reap_invalid: lineage write failed: {e:#}");
        }
    }
    Ok(reaped)
}

#[cfg(test)]
mod tests {
    // Needs a live connection; covered by integration tests against a fake
    // gateway.
}
