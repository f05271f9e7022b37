//! Task 1, database integrity check:
//! flags violations of invariant 2 (two active `IndexRecord`s on the same
//! scope with identical definition) and catalog drift (an active record
//! whose physical index is missing from `pg_indexes`). Reports only; repair
//! is the reaping tasks' job.

use ix_domain::{
    IndexRecord,
    IndexStatus,
};
use ix_gateway::GatewayConnection;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    pub duplicate_definitions: Vec<(uuid::Uuid, uuid::Uuid)>,
    pub missing_from_catalog: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_definitions.is_empty() && self.missing_from_catalog.is_empty()
    }
}

pub async fn check(conn: &GatewayConnection<'_>, live_records: &[IndexRecord]) -> anyhow::Result<IntegrityReport> {
    let mut report = IntegrityReport::default();

    let active: Vec<&IndexRecord> = live_records.iter().filter(|r| r.status == IndexStatus::Active).collect();
    for i in 0..active.len() {
        for j in (i + 1)..active.len() {
            if active[i].same_definition(active[j]) {
                report.duplicate_definitions.push((active[i].id, active[j].id));
            }
        }
    }

    if !active.is_empty() {
        let names = conn
            .query("select indexname from pg_indexes where schemaname = 'public'", &[])
            .await?;
        let present: std::collections::HashSet<String> = names
            .into_iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<_, _>>()?;
        for record in &active {
            if !present.contains(&record.name) {
                report.missing_from_catalog.push(record.name.clone());
            }
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            duplicates = report.duplicate_definitions.len(),
            missing = report.missing_from_catalog.len(),
            "lifecycle integrity check found violations"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::{
        IndexCandidate,
        IndexKind,
        Scope,
    };

    use super::*;

    fn candidate() -> IndexCandidate {
        IndexCandidate {
            scope: Scope::new(Some("t1"), "contacts"),
            columns: vec!["email".into()],
            kind: IndexKind::Btree,
            predicate: None,
            include: vec![],
        }
    }

    #[test]
    fn report_is_clean_when_empty() {
        assert!(IntegrityReport::default().is_clean());
    }

    #[test]
    fn duplicate_active_definitions_are_detected_purely() {
        let mut a = IndexRecord::proposed(&candidate(), Utc::now());
        a.transition(IndexStatus::Building).unwrap();
        a.transition(IndexStatus::Active).unwrap();
        let mut b = IndexRecord::proposed(&candidate(), Utc::now());
        b.transition(IndexStatus::Building).unwrap();
        b.transition(IndexStatus::Active).unwrap();

        let active: Vec<&IndexRecord> = vec![&a, &b];
        assert!(active[0].same_definition(active[1]));
    }
}
