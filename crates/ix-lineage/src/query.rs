//! Read paths over `mutation_event`/`algorithm_usage`.

use std::collections::HashMap;

use chrono::{
    DateTime,
    Utc,
};
use ix_domain::{
    Actor,
    DecisionRationale,
    MutationEvent,
    MutationKind,
};
use ix_gateway::GatewayConnection;
use uuid::Uuid;

pub async fn max_seq_for_scope(conn: &GatewayConnection<'_>, scope_key: &str) -> anyhow::Result<u64> {
    let row = conn
        .query_opt("select coalesce(max(seq), 0) from mutation_event where scope = $1", &[&scope_key])
        .await?;
    let current: i64 = row.map(|r| r.try_get::<_, i64>(0)).transpose()?.unwrap_or(0);
    Ok(current.max(0) as u64)
}

/// Timeline for one `IndexRecord`, ordered by `seq` ascending — the total
/// order promised within a scope.
pub async fn timeline_for_index(conn: &GatewayConnection<'_>, index_ref: Uuid) -> anyhow::Result<Vec<MutationEvent>> {
    let rows = conn
        .query(
            "select id, index_ref, ts, seq, actor, kind, rationale_json, before_summary, after_summary, improvement, explanation \
             from mutation_event where index_ref = $1 order by seq asc",
            &[&index_ref],
        )
        .await?;
    rows.iter().map(row_to_event).collect()
}

pub async fn explanation_for(conn: &GatewayConnection<'_>, mutation_id: Uuid) -> anyhow::Result<Option<String>> {
    let row = conn
        .query_opt("select explanation from mutation_event where id = $1", &[&mutation_id])
        .await?;
    Ok(row.map(|r| r.get::<_, String>("explanation")))
}

/// Generic grouped count, used for both `counts_by_actor` and
/// `counts_by_outcome` (the latter grouping on `kind`). `column` is never
/// caller-supplied user input; it is one of two hard-coded literals chosen
/// by `LineageStore`'s own methods.
pub async fn counts_by(conn: &GatewayConnection<'_>, column: &'static str) -> anyhow::Result<HashMap<String, i64>> {
    let sql = format!("select {column}, count(*) as n from mutation_event group by {column}");
    let rows = conn.query(&sql, &[]).await?;
    let mut out = HashMap::new();
    for row in rows {
        let key: String = row.get(0);
        let n: i64 = row.get(1);
        out.insert(key, n);
    }
    Ok(out)
}

/// Most recent events carrying a recorded `improvement`, newest first,
/// capped at `limit` — the training set `ix-lifecycle`'s retraining task
/// folds into `Features` reconstruction.
pub async fn recent_with_improvement(conn: &GatewayConnection<'_>, limit: i64) -> anyhow::Result<Vec<MutationEvent>> {
    let rows = conn
        .query(
            "select id, index_ref, ts, seq, actor, kind, rationale_json, before_summary, after_summary, improvement, explanation \
             from mutation_event where improvement is not null order by ts desc limit $1",
            &[&limit],
        )
        .await?;
    rows.iter().map(row_to_event).collect()
}

pub async fn algorithm_usage_counts(conn: &GatewayConnection<'_>) -> anyhow::Result<HashMap<String, i64>> {
    let rows = conn
        .query("select algorithm, count(*) as n from algorithm_usage group by algorithm", &[])
        .await?;
    let mut out = HashMap::new();
    for row in rows {
        let key: String = row.get(0);
        let n: i64 = row.get(1);
        out.insert(key, n);
    }
    Ok(out)
}

fn row_to_event(row: &tokio_postgres::Row) -> anyhow::Result<MutationEvent> {
    let seq: i64 = row.try_get("seq")?;
    let actor: String = row.try_get("actor")?;
    let kind: String = row.try_get("kind")?;
    let rationale_json: serde_json::Value = row.try_get("rationale_json")?;
    let before_json: Option<serde_json::Value> = row.try_get("before_summary")?;
    let after_json: Option<serde_json::Value> = row.try_get("after_summary")?;
    let ts: DateTime<Utc> = row.try_get("ts")?;
    Ok(MutationEvent {
        id: row.try_get("id")?,
        index_ref: row.try_get("index_ref")?,
        ts,
        seq: seq.max(0) as u64,
        actor: parse_actor(&actor)?,
        kind: parse_kind(&kind)?,
        rationale: rationale_json_to_rationale(rationale_json)?,
        before_summary: before_json.map(serde_json::from_value).transpose()?,
        after_summary: after_json.map(serde_json::from_value).transpose()?,
        improvement: row.try_get("improvement")?,
        explanation: row.try_get("explanation")?,
    })
}

fn rationale_json_to_rationale(value: serde_json::Value) -> anyhow::Result<DecisionRationale> {
    Ok(serde_json::from_value(value)?)
}

fn parse_actor(raw: &str) -> anyhow::Result<Actor> {
    match raw {
        "engine" => Ok(Actor::Engine),
        "maintainer" => Ok(Actor::Maintainer),
        "operator" => Ok(Actor::Operator),
        other => anyhow::bail!("unknown actor in lineage row: {other}"),
    }
}

fn parse_kind(raw: &str) -> anyhow::Result<MutationKind> {
    match raw {
        "Created" => Ok(MutationKind::Created),
        "Promoted" => Ok(MutationKind::Promoted),
        "Dropped" => Ok(MutationKind::Dropped),
        "RolledBack" => Ok(MutationKind::RolledBack),
        "Rejected" => Ok(MutationKind::Rejected),
        "Skipped" => Ok(MutationKind::Skipped),
        "Failed" => Ok(MutationKind::Failed),
        "Interrupted" => Ok(MutationKind::Interrupted),
        other => anyhow::bail!("unknown mutation kind in lineage row: {other}"),
    }
}
