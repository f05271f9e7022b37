//! `IndexCandidate` and `IndexRecord`.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

/// The scope a mutation applies to: an optional tenant partition plus a
/// table. DDL is serialized per scope via an advisory lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant: Option<String>,
    pub table: String,
}

impl Scope {
    pub fn new(tenant: Option<impl Into<String>>, table: impl Into<String>) -> Self {
        Self {
            tenant: tenant.map(Into::into),
            table: table.into(),
        }
    }

    /// A stable string key for this scope, used as the advisory-lock name
    /// and the rate-limiter/circuit-breaker bucket key.
    pub fn key(&self) -> String {
        match &self.tenant {
            Some(t) => format!("{t}:{}", self.table),
            None => self.table.clone(),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    Btree,
    Hash,
    Gin,
    Partial,
    Expression,
    Covering,
}

impl IndexKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            IndexKind::Btree | IndexKind::Partial | IndexKind::Expression | IndexKind::Covering => "btree",
            IndexKind::Hash => "hash",
            IndexKind::Gin => "gin",
        }
    }

    /// Relative per-write maintenance overhead multiplier, used by the
    /// heuristic layer's `writeOverheadFactor(kind)`.
    pub fn write_overhead_factor(self) -> f64 {
        match self {
            IndexKind::Hash => 0.8,
            IndexKind::Btree => 1.0,
            IndexKind::Partial => 0.6,
            IndexKind::Expression => 1.3,
            IndexKind::Covering => 1.4,
            IndexKind::Gin => 2.0,
        }
    }
}

/// A proposed DDL. Ephemeral inside the decision engine; never persisted
/// unless it is approved and handed to `ix-executor`, which turns it into
/// an [`IndexRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCandidate {
    pub scope: Scope,
    /// Column names in index-key order.
    pub columns: Vec<String>,
    pub kind: IndexKind,
    /// `WHERE` predicate text, for `kind == Partial`.
    pub predicate: Option<String>,
    /// `INCLUDE (...)` columns, for `kind == Covering`.
    pub include: Vec<String>,
}

impl IndexCandidate {
    /// A deterministic name derived from scope and columns, used both as the
    /// DDL identifier and as the equality key for invariant 2 ("no two
    /// IndexRecords on the same scope have identical (columns, predicate,
    /// include-list) while both active").
    pub fn canonical_name(&self) -> String {
        let tenant_part = self.scope.tenant.as_deref().unwrap_or("global");
        let cols = self.columns.join("_");
        format!("ixp_{tenant_part}_{}_{cols}", self.scope.table)
    }

    pub fn definition_key(&self) -> (Vec<String>, Option<String>, Vec<String>) {
        (self.columns.clone(), self.predicate.clone(), self.include.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexStatus {
    Proposed,
    Building,
    Active,
    Deprecated,
    Dropped,
    RolledBack,
    Failed,
}

impl IndexStatus {
    /// State machine: `proposed -> building -> active -> {deprecated |
    /// dropped | rolled-back | failed}`.
    pub fn can_transition_to(self, next: IndexStatus) -> bool {
        use IndexStatus::*;
        matches!(
            (self, next),
            (Proposed, Building)
                | (Building, Active)
                | (Building, Failed)
                | (Active, Deprecated)
                | (Active, Dropped)
                | (Active, RolledBack)
                | (Deprecated, Dropped)
        )
    }
}

/// A committed index. Every transition is written to `ix-lineage` as a
/// [`crate::lineage::MutationEvent`]; this struct is only ever mutated by
/// `ix-executor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: Uuid,
    pub name: String,
    pub scope: Scope,
    pub kind: IndexKind,
    pub columns: Vec<String>,
    pub predicate: Option<String>,
    pub include: Vec<String>,
    pub status: IndexStatus,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub last_validated_improvement: Option<f64>,
}

impl IndexRecord {
    pub fn proposed(candidate: &IndexCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: candidate.canonical_name(),
            scope: candidate.scope.clone(),
            kind: candidate.kind,
            columns: candidate.columns.clone(),
            predicate: candidate.predicate.clone(),
            include: candidate.include.clone(),
            status: IndexStatus::Proposed,
            version: 1,
            created_at: now,
            last_validated_improvement: None,
        }
    }

    /// Equality on (columns, predicate, include) at the same scope,
    /// independent of id or version; no two active records at a scope may
    /// share a definition.
    pub fn same_definition(&self, other: &IndexRecord) -> bool {
        self.scope == other.scope
            && self.columns == other.columns
            && self.predicate == other.predicate
            && self.include == other.include
    }

    pub fn transition(&mut self, next: IndexStatus) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.status.can_transition_to(next),
            "illegal IndexRecord transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> IndexCandidate {
        IndexCandidate {
            scope: Scope::new(Some("t1"), "contacts"),
            columns: vec!["tenant_id".into(), "email".into()],
            kind: IndexKind::Btree,
            predicate: None,
            include: vec![],
        }
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut record = IndexRecord::proposed(&candidate(), Utc::now());
        assert!(record.transition(IndexStatus::Active).is_err());
        assert!(record.transition(IndexStatus::Building).is_ok());
        assert!(record.transition(IndexStatus::Active).is_ok());
        assert_eq!(record.version, 3);
    }

    #[test]
    fn same_definition_ignores_id_and_version() {
        let a = IndexRecord::proposed(&candidate(), Utc::now());
        let mut b = IndexRecord::proposed(&candidate(), Utc::now());
        b.version = 5;
        assert!(a.same_definition(&b));
    }
}
