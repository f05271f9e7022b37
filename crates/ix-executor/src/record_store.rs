//! Persistence for `index_record`. C8
//! is the only writer of `IndexRecord` transitions;
//! every reader elsewhere in the workspace — `ix-lifecycle`'s tier tasks,
//! `ix-decision`'s `active_equivalent_exists` check, `ix-daemon`'s startup
//! rehydration and `verify`/`rollback` CLI commands — goes through
//! [`list_active`]/[`find_by_id`] here rather than touching the table
//! directly.
//!
//! Grounded on `ix-lineage::insert`/`query`'s parameter-bound idiom: build
//! the statement once, bind every column through `ToSql`, never
//! interpolate. Unlike lineage (append-only), this table is mutated in
//! place: each transition is an `upsert on conflict (id) do update`, so a
//! retried write after a dropped connection is naturally idempotent.

use ix_domain::{
    IndexKind,
    IndexRecord,
    IndexStatus,
    Scope,
};
use ix_gateway::GatewayConnection;
use uuid::Uuid;

pub async fn upsert(conn: &GatewayConnection<'_>, record: &IndexRecord) -> anyhow::Result<()> {
    let columns_json = serde_json::to_value(&record.columns)?;
    let include_json = serde_json::to_value(&record.include)?;
    let kind = kind_to_str(record.kind);
    let status = status_to_str(record.status);
    conn.execute(
        "insert into index_record \
         (id, name, tenant, table_name, kind, columns, predicate, include, status, version, created_at, last_validated_improvement) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
         on conflict (id) do update set \
         name = excluded.name, status = excluded.status, version = excluded.version, \
         last_validated_improvement = excluded.last_validated_improvement",
        &[
            &record.id,
            &record.name,
            &record.scope.tenant,
            &record.scope.table,
            &kind,
            &columns_json,
            &record.predicate,
            &include_json,
            &status,
            &(record.version as i64),
            &record.created_at,
            &record.last_validated_improvement,
        ],
    )
    .await?;
    Ok(())
}

pub async fn find_by_id(conn: &GatewayConnection<'_>, id: Uuid) -> anyhow::Result<Option<IndexRecord>> {
    let row = conn
        .query_opt(
            "select id, name, tenant, table_name, kind, columns, predicate, include, status, version, created_at, last_validated_improvement \
             from index_record where id = $1",
            &[&id],
        )
        .await?;
    row.as_ref().map(row_to_record).transpose()
}

pub async fn find_active_by_scope(conn: &GatewayConnection<'_>, scope: &Scope) -> anyhow::Result<Option<IndexRecord>> {
    let row = conn
        .query_opt(
            "select id, name, tenant, table_name, kind, columns, predicate, include, status, version, created_at, last_validated_improvement \
             from index_record where tenant is not distinct from $1 and table_name = $2 and status = 'active'",
            &[&scope.tenant, &scope.table],
        )
        .await?;
    row.as_ref().map(row_to_record).transpose()
}

/// Every currently-active `IndexRecord`, the live set `ix-daemon` rehydrates
/// at startup and hands to `ix-lifecycle`'s tier tasks and `ix-decision`'s
/// early-exit check on every tick.
pub async fn list_active(conn: &GatewayConnection<'_>) -> anyhow::Result<Vec<IndexRecord>> {
    let rows = conn
        .query(
            "select id, name, tenant, table_name, kind, columns, predicate, include, status, version, created_at, last_validated_improvement \
             from index_record where status = 'active'",
            &[],
        )
        .await?;
    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &tokio_postgres::Row) -> anyhow::Result<IndexRecord> {
    let tenant: Option<String> = row.try_get("tenant")?;
    let table: String = row.try_get("table_name")?;
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let columns_json: serde_json::Value = row.try_get("columns")?;
    let include_json: serde_json::Value = row.try_get("include")?;
    let version: i64 = row.try_get("version")?;
    Ok(IndexRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        scope: Scope::new(tenant, table),
        kind: str_to_kind(&kind)?,
        columns: serde_json::from_value(columns_json)?,
        predicate: row.try_get("predicate")?,
        include: serde_json::from_value(include_json)?,
        status: str_to_status(&status)?,
        version: version.max(0) as u32,
        created_at: row.try_get("created_at")?,
        last_validated_improvement: row.try_get("last_validated_improvement")?,
    })
}

fn kind_to_str(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::Btree => "btree",
        IndexKind::Hash => "hash",
        IndexKind::Gin => "gin",
        IndexKind::Partial => "partial",
        IndexKind::Expression => "expression",
        IndexKind::Covering => "covering",
    }
}

fn str_to_kind(raw: &str) -> anyhow::Result<IndexKind> {
    match raw {
        "btree" => Ok(IndexKind::Btree),
        "hash" => Ok(IndexKind::Hash),
        "gin" => Ok(IndexKind::Gin),
        "partial" => Ok(IndexKind::Partial),
        "expression" => Ok(IndexKind::Expression),
        "covering" => Ok(IndexKind::Covering),
        other => anyhow::bail!("unknown index kind in index_record row: {other}"),
    }
}

fn status_to_str(status: IndexStatus) -> &'static str {
    match status {
        IndexStatus::Proposed => "proposed",
        IndexStatus::Building => "building",
        IndexStatus::Active => "active",
        IndexStatus::Deprecated => "deprecated",
        IndexStatus::Dropped => "dropped",
        IndexStatus::RolledBack => "rolled-back",
        IndexStatus::Failed => "failed",
    }
}

fn str_to_status(raw: &str) -> anyhow::Result<IndexStatus> {
    match raw {
        "proposed" => Ok(IndexStatus::Proposed),
        "building" => Ok(IndexStatus::Building),
        "active" => Ok(IndexStatus::Active),
        "deprecated" => Ok(IndexStatus::Deprecated),
        "dropped" => Ok(IndexStatus::Dropped),
        "rolled-back" => Ok(IndexStatus::RolledBack),
        "failed" => Ok(IndexStatus::Failed),
        other => anyhow::bail!("unknown index status in index_record row: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_string_form() {
        for kind in [IndexKind::Btree, IndexKind::Hash, IndexKind::Gin, IndexKind::Partial, IndexKind::Expression, IndexKind::Covering] {
            assert_eq!(str_to_kind(kind_to_str(kind)).unwrap(), kind);
        }
    }

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in [
            IndexStatus::Proposed,
            IndexStatus::Building,
            IndexStatus::Active,
            IndexStatus::Deprecated,
            IndexStatus::Dropped,
            IndexStatus::RolledBack,
            IndexStatus::Failed,
        ] {
            assert_eq!(str_to_status(status_to_str(status)).unwrap(), status);
        }
    }
}
