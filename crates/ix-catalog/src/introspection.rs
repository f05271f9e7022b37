//! Live-database catalog introspection.
//!
//! Reads `information_schema.columns` through the gateway's typed query API
//! and classifies each column's physical type into [`PhysicalType`]. Tenant
//! tables are discovered dynamically by the presence of the configured
//! tenant column, never hard-coded.

use ix_domain::{
    CanonicalField,
    PhysicalType,
};
use ix_gateway::GatewayConnection;

fn classify_type(udt_name: &str) -> PhysicalType {
    match udt_name {
        "int2" => PhysicalType::SmallInt,
        "int4" => PhysicalType::Integer,
        "int8" => PhysicalType::BigInt,
        "numeric" => PhysicalType::Numeric,
        "float4" => PhysicalType::Real,
        "float8" => PhysicalType::DoublePrecision,
        "text" => PhysicalType::Text,
        "varchar" | "bpchar" => PhysicalType::VarChar,
        "bool" => PhysicalType::Boolean,
        "timestamp" => PhysicalType::Timestamp,
        "timestamptz" => PhysicalType::TimestampTz,
        "uuid" => PhysicalType::Uuid,
        "jsonb" => PhysicalType::Jsonb,
        _ => PhysicalType::Other,
    }
}

/// Types considered carriers for a useful index. Boolean and jsonb columns
/// are indexable via partial/gin paths elsewhere but are excluded from the
/// default btree universe here.
fn is_indexable(physical_type: PhysicalType) -> bool {
    !matches!(physical_type, PhysicalType::Other | PhysicalType::Jsonb)
}

/// Reads every user-table column from `information_schema.columns`, one
/// [`CanonicalField`] per row. Idempotent: re-running against an unchanged
/// schema snapshot produces the same set, since the
/// output is a pure function of the rows returned.
pub async fn introspect_fields(conn: &GatewayConnection<'_>) -> anyhow::Result<Vec<CanonicalField>> {
    let rows = conn
        .query(
            "select table_name, column_name, udt_name \
             from information_schema.columns \
             where table_schema = 'public' \
             order by table_name, column_name",
            &[],
        )
        .await?;
    let mut fields = Vec::with_capacity(rows.len());
    for row in rows {
        let table: String = row.try_get("table_name")?;
        let field: String = row.try_get("column_name")?;
        let udt_name: String = row.try_get("udt_name")?;
        let physical_type = classify_type(&udt_name);
        fields.push(CanonicalField {
            table,
            field,
            physical_type,
            indexable: is_indexable(physical_type),
            tags: vec![],
        });
    }
    Ok(fields)
}

/// Discovers every table carrying the configured tenant column, by scanning
/// `CanonicalField` for a column named `tenant_id` (or a configured
/// variant).
pub fn tenant_tables(fields: &[CanonicalField], tenant_column: &str) -> Vec<String> {
    let mut tables: Vec<String> = fields
        .iter()
        .filter(|f| f.field == tenant_column)
        .map(|f| f.table.clone())
        .collect();
    tables.sort();
    tables.dedup();
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(table: &str, field: &str, pt: PhysicalType) -> CanonicalField {
        CanonicalField {
            table: table.into(),
            field: field.into(),
            physical_type: pt,
            indexable: is_indexable(pt),
            tags: vec![],
        }
    }

    #[test]
    fn classifies_common_udt_names() {
        assert_eq!(classify_type("int8"), PhysicalType::BigInt);
        assert_eq!(classify_type("timestamptz"), PhysicalType::TimestampTz);
        assert_eq!(classify_type("some_enum"), PhysicalType::Other);
    }

    #[test]
    fn tenant_tables_are_discovered_by_column_name_not_hardcoded() {
        let fields = vec![
            field("contacts", "tenant_id", PhysicalType::Uuid),
            field("contacts", "email", PhysicalType::Text),
            field("orgs", "org_tenant", PhysicalType::Uuid),
            field("audit_log", "tenant_id", PhysicalType::Uuid),
        ];
        assert_eq!(tenant_tables(&fields, "tenant_id"), vec!["audit_log", "contacts"]);
        assert_eq!(tenant_tables(&fields, "org_tenant"), vec!["orgs"]);
    }
}
