//! Task 10, workload analysis: classifies every table's current read/write mix from
//! `pg_stat_user_tables` counters, independent of any sliding window of
//! `QuerySample`s — this is a fleet-wide structural snapshot, not the
//! per-(tenant, table, field) pattern analysis `ix-analyzer` does over
//! ingested samples. `fk_suggestions::find_missing` reads this to skip
//! small workloads; `ix-decision`'s own workload modulation consumes
//! `WorkloadClass` directly from its candidate-specific feature vector.

use ix_domain::WorkloadClass;
use ix_gateway::GatewayConnection;

#[derive(Debug, Clone, PartialEq)]
pub struct TableWorkload {
    pub table: String,
    pub reads: u64,
    pub writes: u64,
    pub workload_class: WorkloadClass,
}

impl TableWorkload {
    pub fn query_count(&self) -> u64 {
        self.reads + self.writes
    }

    fn classify(reads: u64, writes: u64) -> WorkloadClass {
        let ratio = if writes == 0 { f64::INFINITY } else { reads as f64 / writes as f64 };
        WorkloadClass::from_ratio(ratio)
    }
}

pub async fn classify_all(conn: &GatewayConnection<'_>) -> anyhow::Result<Vec<TableWorkload>> {
    let rows = conn
        .query(
            "select relname, seq_scan + idx_scan, n_tup_ins + n_tup_upd + n_tup_del \
             from pg_stat_user_tables",
            &[],
        )
        .await?;
    rows.into_iter()
        .map(|row| {
            let table: String = row.try_get(0)?;
            let reads: i64 = row.try_get(1)?;
            let writes: i64 = row.try_get(2)?;
            let reads = reads.max(0) as u64;
            let writes = writes.max(0) as u64;
            Ok(TableWorkload {
                table,
                reads,
                writes,
                workload_class: TableWorkload::classify(reads, writes),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_workload_class_boundaries() {
        assert_eq!(TableWorkload::classify(900, 100), WorkloadClass::ReadHeavy);
        assert_eq!(TableWorkload::classify(100, 900), WorkloadClass::WriteHeavy);
        assert_eq!(TableWorkload::classify(500, 500), WorkloadClass::Balanced);
    }

    #[test]
    fn a_table_with_no_writes_is_read_heavy() {
        assert_eq!(TableWorkload::classify(100, 0), WorkloadClass::ReadHeavy);
    }

    // `classify_all` needs a live connection; covered by integration tests
    // against a fake gateway.
}
