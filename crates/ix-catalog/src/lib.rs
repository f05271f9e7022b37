//! Canonical catalog and tenant activation map.
//!
//! `ix-catalog` is the only writer of `CanonicalField`/`TenantActivation`
//!; every other component reads an immutable
//! [`ix_domain::CatalogSnapshot`] handed to it at startup or refresh.

pub mod file_source;
pub mod introspection;

use std::sync::Arc;

use chrono::Utc;
use ix_config::{
    BootstrapSource,
    CatalogConfig,
};
use ix_domain::{
    CatalogSnapshot,
    TenantActivation,
};
use ix_gateway::ConnectionPool;
use parking_lot::RwLock;

/// Owns the catalog snapshot and serializes mutation to it. Cloned cheaply
/// (an `Arc` inside) and shared with every other component as a read path;
/// `bootstrap`/`activate`/`deactivate` are the only write paths.
pub struct Catalog {
    snapshot: Arc<RwLock<CatalogSnapshot>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(CatalogSnapshot::default())),
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.read().clone()
    }

    /// Bootstraps `CanonicalField` from either a live database or a config
    /// file, per the configured [`BootstrapSource`]. Idempotent: a second
    /// call against an unchanged source reassigns the same field set
    /// rather than appending to it.
    pub async fn bootstrap(
        &self,
        config: &CatalogConfig,
        pool: Option<&Arc<ConnectionPool>>,
        file_json: Option<&str>,
    ) -> anyhow::Result<()> {
        let fields = match config.bootstrap_source {
            BootstrapSource::IntrospectLive => {
                let pool = pool.ok_or_else(|| anyhow::anyhow!("introspect-live requires a connection pool"))?;
                let conn = pool.acquire().await?;
                introspection::introspect_fields(&conn).await?
            },
            BootstrapSource::LoadFile => {
                let json =
                    file_json.ok_or_else(|| anyhow::anyhow!("load-file bootstrap requires file_json"))?;
                file_source::load_fields(json)?
            },
        };
        let mut snapshot = self.snapshot.write();
        snapshot.fields = fields;
        tracing::info!(fields = snapshot.fields.len(), "catalog bootstrap complete");
        Ok(())
    }

    /// Tables carrying the configured tenant column, discovered from the
    /// already-bootstrapped field set.
    pub fn tenant_tables(&self, config: &CatalogConfig) -> Vec<String> {
        introspection::tenant_tables(&self.snapshot.read().fields, &config.tenant_column)
    }

    /// Marks `fields` as active for `tenant`. Fields not present in
    /// `CanonicalField`, or not `indexable`, are silently skipped: activation
    /// is a subset operation, not a declaration of new fields.
    pub fn activate(&self, tenant: &str, fields: &[(String, String)]) {
        let mut snapshot = self.snapshot.write();
        let now = Utc::now();
        for (table, field) in fields {
            if !snapshot.is_indexable(table, field) {
                tracing::warn!(tenant, table, field, "skipping activation of non-indexable field");
                continue;
            }
            if snapshot.is_active_for_tenant(tenant, table, field) {
                continue;
            }
            snapshot.activations.push(TenantActivation {
                tenant: tenant.to_owned(),
                table: table.clone(),
                field: field.clone(),
                active_since: now,
            });
        }
    }

    pub fn deactivate(&self, tenant: &str, fields: &[(String, String)]) {
        let mut snapshot = self.snapshot.write();
        snapshot
            .activations
            .retain(|a| !(a.tenant == tenant && fields.iter().any(|(t, f)| *t == a.table && *f == a.field)));
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_from_file_is_idempotent() {
        let json = r#"[
            {"table": "contacts", "field": "email", "physical_type": "Text", "indexable": true, "tags": []}
        ]"#;
        let config = CatalogConfig {
            bootstrap_source: ix_config::BootstrapSource::LoadFile,
            tenant_column: "tenant_id".into(),
        };
        let catalog = Catalog::empty();
        catalog.bootstrap(&config, None, Some(json)).await.unwrap();
        let first = catalog.snapshot();
        catalog.bootstrap(&config, None, Some(json)).await.unwrap();
        let second = catalog.snapshot();
        assert_eq!(first.fields, second.fields);
    }

    #[test]
    fn activation_skips_non_indexable_fields() {
        let catalog = Catalog::empty();
        {
            let mut snapshot = catalog.snapshot.write();
            snapshot.fields.push(ix_domain::CanonicalField {
                table: "contacts".into(),
                field: "blob".into(),
                physical_type: ix_domain::PhysicalType::Other,
                indexable: false,
                tags: vec![],
            });
        }
        catalog.activate("t1", &[("contacts".into(), "blob".into())]);
        assert!(catalog.snapshot().activations.is_empty());
    }

    #[test]
    fn deactivate_removes_only_named_fields_for_the_tenant() {
        let catalog = Catalog::empty();
        {
            let mut snapshot = catalog.snapshot.write();
            snapshot.fields.push(ix_domain::CanonicalField {
                table: "contacts".into(),
                field: "email".into(),
                physical_type: ix_domain::PhysicalType::Text,
                indexable: true,
                tags: vec![],
            });
        }
        catalog.activate("t1", &[("contacts".into(), "email".into())]);
        catalog.activate("t2", &[("contacts".into(), "email".into())]);
        catalog.deactivate("t1", &[("contacts".into(), "email".into())]);
        let snapshot = catalog.snapshot();
        assert!(!snapshot.is_active_for_tenant("t1", "contacts", "email"));
        assert!(snapshot.is_active_for_tenant("t2", "contacts", "email"));
    }
}
