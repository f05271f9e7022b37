//! Task 8, consolidation suggestions: two active
//! indexes on the same scope whose keys share a leading column but neither
//! is a prefix of the other — unlike `redundant::detect`'s strict-prefix
//! case, neither index already serves the other's queries, but a single
//! broader index over the union of both keys would serve both. Pure and
//! synchronous, same input as `redundant::detect`.

use std::collections::BTreeSet;

use ix_domain::{
    IndexKind,
    IndexRecord,
    IndexStatus,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationOpportunity {
    pub table: String,
    pub indexes: Vec<Uuid>,
    /// The leading column the candidate indexes share, kept first so the
    /// consolidated index still serves lookups on that column alone.
    pub shared_leading_column: String,
    pub suggested_columns: Vec<String>,
}

fn shares_leading_column_without_prefix(a: &[String], b: &[String]) -> bool {
    match (a.first(), b.first()) {
        (Some(x), Some(y)) if x == y => !a.starts_with(b) && !b.starts_with(a),
        _ => false,
    }
}

pub fn detect(live_records: &[IndexRecord]) -> Vec<ConsolidationOpportunity> {
    let active: Vec<&IndexRecord> = live_records
        .iter()
        .filter(|r| r.status == IndexStatus::Active && r.kind == IndexKind::Btree)
        .collect();

    let mut opportunities = Vec::new();
    for i in 0..active.len() {
        for j in (i + 1)..active.len() {
            let a = active[i];
            let b = active[j];
            if a.scope != b.scope {
                continue;
            }
            if !shares_leading_column_without_prefix(&a.columns, &b.columns) {
                continue;
            }
            let leading = a.columns[0].clone();
            let mut suggested: Vec<String> = vec![leading.clone()];
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            seen.insert(leading.as_str());
            for col in a.columns.iter().chain(b.columns.iter()) {
                if seen.insert(col.as_str()) {
                    suggested.push(col.clone());
                }
            }
            opportunities.push(ConsolidationOpportunity {
                table: a.scope.table.clone(),
                indexes: vec![a.id, b.id],
                shared_leading_column: leading,
                suggested_columns: suggested,
            });
        }
    }
    opportunities
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::Scope;

    use super::*;

    fn active_record(columns: &[&str]) -> IndexRecord {
        let candidate = ix_domain::IndexCandidate {
            scope: Scope::new(Some("t1"), "contacts"),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            kind: IndexKind::Btree,
            predicate: None,
            include: vec![],
        };
        let mut record = IndexRecord::proposed(&candidate, Utc::now());
        record.transition(IndexStatus::Building).unwrap();
        record.transition(IndexStatus::Active).unwrap();
        record
    }

    #[test]
    fn sibling_indexes_sharing_a_leading_column_are_an_opportunity() {
        let a = active_record(&["tenant_id", "status"]);
        let b = active_record(&["tenant_id", "created_at"]);
        let found = detect(&[a.clone(), b.clone()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shared_leading_column, "tenant_id");
        assert_eq!(found[0].suggested_columns, vec!["tenant_id", "status", "created_at"]);
    }

    #[test]
    fn a_prefix_pair_is_not_a_consolidation_opportunity() {
        let a = active_record(&["tenant_id"]);
        let b = active_record(&["tenant_id", "status"]);
        assert!(detect(&[a, b]).is_empty());
    }

    #[test]
    fn no_shared_leading_column_is_not_an_opportunity() {
        let a = active_record(&["tenant_id"]);
        let b = active_record(&["email"]);
        assert!(detect(&[a, b]).is_empty());
    }
}
