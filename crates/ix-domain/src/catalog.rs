//! `CanonicalField` and `TenantActivation`.

use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalType {
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    DoublePrecision,
    Text,
    VarChar,
    Boolean,
    Timestamp,
    TimestampTz,
    Uuid,
    Jsonb,
    Other,
}

/// The universe of (table, field) pairs eligible to carry an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalField {
    pub table: String,
    pub field: String,
    pub physical_type: PhysicalType,
    pub indexable: bool,
    pub tags: Vec<String>,
}

impl CanonicalField {
    pub fn key(&self) -> (String, String) {
        (self.table.clone(), self.field.clone())
    }
}

/// The per-tenant subset of `CanonicalField`s currently active for decision
/// making. No decision may reference a (tenant, field) outside this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantActivation {
    pub tenant: String,
    pub table: String,
    pub field: String,
    pub active_since: chrono::DateTime<chrono::Utc>,
}

/// In-memory view of the catalog plus activations, built by `ix-catalog`
/// and consumed read-only by every other component.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub fields: Vec<CanonicalField>,
    pub activations: Vec<TenantActivation>,
}

impl CatalogSnapshot {
    pub fn is_indexable(&self, table: &str, field: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.table == table && f.field == field && f.indexable)
    }

    pub fn is_active_for_tenant(&self, tenant: &str, table: &str, field: &str) -> bool {
        self.activations
            .iter()
            .any(|a| a.tenant == tenant && a.table == table && a.field == field)
    }

    pub fn active_fields_for_tenant<'a>(
        &'a self,
        tenant: &'a str,
    ) -> impl Iterator<Item = &'a TenantActivation> {
        self.activations.iter().filter(move |a| a.tenant == tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(table: &str, field: &str, indexable: bool) -> CanonicalField {
        CanonicalField {
            table: table.to_owned(),
            field: field.to_owned(),
            physical_type: PhysicalType::Text,
            indexable,
            tags: vec![],
        }
    }

    #[test]
    fn activation_respects_tenant_scope() {
        let snapshot = CatalogSnapshot {
            fields: vec![field("contacts", "email", true)],
            activations: vec![TenantActivation {
                tenant: "t1".into(),
                table: "contacts".into(),
                field: "email".into(),
                active_since: chrono::Utc::now(),
            }],
        };
        assert!(snapshot.is_active_for_tenant("t1", "contacts", "email"));
        assert!(!snapshot.is_active_for_tenant("t2", "contacts", "email"));
    }
}
