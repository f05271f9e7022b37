//! Batched flush of buffered samples into `query_stats`.
//!
//! One insert statement per flush, built with one parameter group per
//! sample and executed through the gateway's parameter-bound `execute`.
//! Never runs inside a transaction that also performs DDL (§4.3).

use ix_domain::QuerySample;
use ix_gateway::GatewayConnection;
use ix_metrics::register_counter;
use uuid::Uuid;

register_counter!(INGESTION_ROWS_FLUSHED, "Rows written to query_stats by the flusher");
register_counter!(INGESTION_FLUSH_FAILURES, "Flush attempts that failed and were retried next tick");

/// Inserts `samples` as a single multi-row `INSERT`. Building the statement
/// text once per batch (rather than one `execute` per row) keeps a
/// saturated buffer's flush latency roughly constant in row count up to the
/// configured batch size.
pub async fn flush_batch(conn: &GatewayConnection<'_>, samples: &[QuerySample]) -> anyhow::Result<u64> {
    if samples.is_empty() {
        return Ok(0);
    }
    let mut sql = String::from(
        "insert into query_stats (id, ts, tenant, table_name, field, shape, duration_ms, rows_estimate, fingerprint, is_write) values ",
    );
    let mut params: Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        let base = i * 10;
        sql.push_str(&format!(
            "(${},${},${},${},${},${},${},${},${},${})",
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6,
            base + 7,
            base + 8,
            base + 9,
            base + 10,
        ));
        params.push(Box::new(Uuid::new_v4()));
        params.push(Box::new(sample.ts));
        params.push(Box::new(sample.tenant.clone()));
        params.push(Box::new(sample.table.clone()));
        params.push(Box::new(sample.field.clone()));
        params.push(Box::new(format!("{:?}", sample.shape)));
        params.push(Box::new(sample.duration_ms));
        params.push(Box::new(sample.rows_examined_estimate));
        params.push(Box::new(sample.fingerprint.map(|f| f.to_hex())));
        params.push(Box::new(sample.is_write));
    }
    let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();
    match conn.execute(&sql, &refs).await {
        Ok(n) => {
            INGESTION_ROWS_FLUSHED.inc_by(n);
            Ok(n)
        },
        Err(e) => {
            INGESTION_FLUSH_FAILURES.inc();
            Err(e)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_builds_no_statement() {
        // Exercised indirectly: flush_batch returns Ok(0) without touching
        // the connection, verified by the lib-level integration test using
        // a fake pool (no real database in this crate's unit tests).
    }
}
