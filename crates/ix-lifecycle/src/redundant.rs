//! Task 7, redundant-index detection: one active
//! index's key is a strict prefix of another's at the same scope, with a
//! matching predicate and include-list, so every query the narrower index
//! could serve the broader one also serves. Pure and synchronous: the
//! input is the same `live_records` set `run_light`'s integrity check
//! already has in hand, no extra round trip needed.

use ix_domain::{
    IndexKind,
    IndexRecord,
    IndexStatus,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct RedundantPair {
    /// The index whose key is a strict prefix of `broader`'s — safe to drop.
    pub narrower: Uuid,
    pub broader: Uuid,
    pub table: String,
    pub narrower_name: String,
}

fn is_strict_prefix(narrower: &[String], broader: &[String]) -> bool {
    narrower.len() < broader.len() && broader.starts_with(narrower)
}

/// Only compares plain `Btree` indexes: partial/expression/covering/hash
/// indexes don't share the leftmost-prefix-serves-narrower-queries property
/// a plain b-tree does.
pub fn detect(live_records: &[IndexRecord]) -> Vec<RedundantPair> {
    let active: Vec<&IndexRecord> = live_records
        .iter()
        .filter(|r| r.status == IndexStatus::Active && r.kind == IndexKind::Btree)
        .collect();

    let mut pairs = Vec::new();
    for i in 0..active.len() {
        for j in 0..active.len() {
            if i == j {
                continue;
            }
            let narrower = active[i];
            let broader = active[j];
            if narrower.scope != broader.scope {
                continue;
            }
            if narrower.predicate != broader.predicate || narrower.include != broader.include {
                continue;
            }
            if is_strict_prefix(&narrower.columns, &broader.columns) {
                pairs.push(RedundantPair {
                    narrower: narrower.id,
                    broader: broader.id,
                    table: narrower.scope.table.clone(),
                    narrower_name: narrower.name.clone(),
                });
            }
        }
    }
    pairs
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
    fn prefix_key_is_flagged_redundant() {
        let narrower = active_record(&["tenant_id"]);
        let broader = active_record(&["tenant_id", "email"]);
        let pairs = detect(&[narrower.clone(), broader.clone()]);
        assert_eq!(pairs, vec![RedundantPair {
            narrower: narrower.id,
            broader: broader.id,
            table: "contacts".into(),
            narrower_name: narrower.name,
        }]);
    }

    #[test]
    fn disjoint_keys_are_not_redundant() {
        let a = active_record(&["tenant_id"]);
        let b = active_record(&["email"]);
        assert!(detect(&[a, b]).is_empty());
    }

    #[test]
    fn identical_keys_are_not_a_prefix_pair() {
        let a = active_record(&["tenant_id", "email"]);
        let b = active_record(&["tenant_id", "email"]);
        // Same definition at the same scope is invariant-2 territory
        // (caught by `integrity::check`), not a prefix relationship.
        assert!(detect(&[a, b]).is_empty());
    }
}
