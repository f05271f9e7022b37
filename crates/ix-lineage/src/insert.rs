//! Single-row inserts into `mutation_event`/`algorithm_usage`. Grounded on
//! `ix-ingestion::flush`'s parameter-bound insert idiom: build the statement
//! text once, bind every column through `ToSql`, never interpolate a value.
//! Lineage writes one event at a time (not micro-batched like ingestion
//! samples) since each write follows directly from one executor decision.

use ix_domain::{
    AlgorithmUsage,
    MutationEvent,
};
use ix_gateway::GatewayConnection;
use ix_metrics::register_counter;

register_counter!(LINEAGE_MUTATION_EVENTS_WRITTEN, "MutationEvent rows appended to lineage");
register_counter!(LINEAGE_ALGORITHM_USAGE_WRITTEN, "AlgorithmUsage rows appended to lineage");

pub async fn insert_mutation_event(
    conn: &GatewayConnection<'_>,
    event: &MutationEvent,
    scope_key: &str,
) -> anyhow::Result<()> {
    let rationale_json = serde_json::to_value(&event.rationale)?;
    let before_json = event.before_summary.as_ref().map(serde_json::to_value).transpose()?;
    let after_json = event.after_summary.as_ref().map(serde_json::to_value).transpose()?;
    let kind = format!("{:?}", event.kind);
    let actor = event.actor.as_str();
    conn.execute(
        "insert into mutation_event \
         (id, index_ref, scope, ts, seq, actor, kind, rationale_json, before_summary, after_summary, improvement, explanation) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        &[
            &event.id,
            &event.index_ref,
            &scope_key,
            &event.ts,
            &(event.seq as i64),
            &actor,
            &kind,
            &rationale_json,
            &before_json,
            &after_json,
            &event.improvement,
            &event.explanation,
        ],
    )
    .await?;
    LINEAGE_MUTATION_EVENTS_WRITTEN.inc();
    Ok(())
}

pub async fn insert_algorithm_usage(conn: &GatewayConnection<'_>, usage: &AlgorithmUsage) -> anyhow::Result<()> {
    conn.execute(
        "insert into algorithm_usage (id, ts, algorithm, scope, input_hash, output_json) values ($1,$2,$3,$4,$5,$6)",
        &[
            &usage.id,
            &usage.ts,
            &usage.algorithm,
            &usage.scope,
            &usage.input_hash,
            &usage.output,
        ],
    )
    .await?;
    LINEAGE_ALGORITHM_USAGE_WRITTEN.inc();
    Ok(())
}
