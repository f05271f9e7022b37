//! Read path over `query_stats`. `ix-ingestion` owns both sides of this table
//! — `flush` the writes, this module the reads — so the row shape only
//! needs to agree with itself in one place. `ix-analyzer` stays a pure
//! function over `&[QuerySample]`; whatever calls it (`ix-daemon`'s
//! `analyze`/`apply` commands) loads the window through here first.

use chrono::{
    DateTime,
    Duration,
    Utc,
};
use ix_domain::{
    Fingerprint,
    QueryShape,
    QuerySample,
};
use ix_gateway::GatewayConnection;

/// Every sample for `(tenant, table, field)` with `ts` in `[now - window,
/// now]`, oldest first. `tenant = None` matches rows with a null tenant
/// column (the untenanted/global scope), not every tenant.
pub async fn load_window(
    conn: &GatewayConnection<'_>,
    tenant: Option<&str>,
    table: &str,
    field: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> anyhow::Result<Vec<QuerySample>> {
    let window_start = now - window;
    let rows = conn
        .query(
            "select ts, tenant, table_name, field, shape, duration_ms, rows_estimate, fingerprint, is_write \
             from query_stats \
             where tenant is not distinct from $1 and table_name = $2 and field = $3 and ts between $4 and $5 \
             order by ts asc",
            &[&tenant, &table, &field, &window_start, &now],
        )
        .await?;
    rows.iter().map(row_to_sample).collect()
}

fn row_to_sample(row: &tokio_postgres::Row) -> anyhow::Result<QuerySample> {
    let shape: String = row.try_get("shape")?;
    let fingerprint_hex: Option<String> = row.try_get("fingerprint")?;
    Ok(QuerySample {
        ts: row.try_get("ts")?,
        tenant: row.try_get("tenant")?,
        table: row.try_get("table_name")?,
        field: row.try_get("field")?,
        shape: parse_shape(&shape)?,
        duration_ms: row.try_get("duration_ms")?,
        rows_examined_estimate: row.try_get("rows_estimate")?,
        fingerprint: fingerprint_hex.map(|hex| parse_fingerprint(&hex)).transpose()?,
        is_write: row.try_get("is_write")?,
    })
}

fn parse_shape(raw: &str) -> anyhow::Result<QueryShape> {
    match raw {
        "PointLookup" => Ok(QueryShape::PointLookup),
        "Range" => Ok(QueryShape::Range),
        "JoinProbe" => Ok(QueryShape::JoinProbe),
        "Aggregate" => Ok(QueryShape::Aggregate),
        "FullScan" => Ok(QueryShape::FullScan),
        "Unknown" => Ok(QueryShape::Unknown),
        other => anyhow::bail!("unknown query shape in query_stats row: {other}"),
    }
}

fn parse_fingerprint(hex: &str) -> anyhow::Result<Fingerprint> {
    anyhow::ensure!(hex.len() == 32, "fingerprint hex must be 32 chars, got {}", hex.len());
    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)?;
    }
    Ok(Fingerprint(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_round_trips_through_its_debug_form() {
        for shape in [
            QueryShape::PointLookup,
            QueryShape::Range,
            QueryShape::JoinProbe,
            QueryShape::Aggregate,
            QueryShape::FullScan,
            QueryShape::Unknown,
        ] {
            assert_eq!(parse_shape(&format!("{shape:?}")).unwrap(), shape);
        }
    }

    #[test]
    fn fingerprint_round_trips_through_hex() {
        let fp = Fingerprint([7; 16]);
        assert_eq!(parse_fingerprint(&fp.to_hex()).unwrap(), fp);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(parse_fingerprint("not-hex").is_err());
    }
}
