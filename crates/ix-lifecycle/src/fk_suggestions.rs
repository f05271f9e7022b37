//! Task 11, foreign-key index suggestions: Postgres does not automatically
//! index the referencing side of a foreign key, so a join or cascade
//! delete on an unindexed FK column forces a sequential scan. This is the
//! standard `pg_constraint`-vs-`pg_index` query operators run by hand;
//! `find_missing` just automates it and skips tables `workload_analysis`
//! classifies as small.

use ix_analyzer::is_small_workload;
use ix_gateway::GatewayConnection;

use crate::workload_analysis::TableWorkload;

/// Matches `ix-decision`'s own small-workload default
/// (`DecisionConfig::small_workload_threshold`); lifecycle tasks don't
/// carry a `DecisionConfig`, so this is kept as an explicit constant rather
/// than threaded through from a crate that otherwise has nothing to do with
/// maintenance scheduling.
const FK_SUGGESTION_MIN_QUERIES: u64 = 5_000;

#[derive(Debug, Clone, PartialEq)]
pub struct FkSuggestion {
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
}

pub async fn find_missing(conn: &GatewayConnection<'_>, workload: &[TableWorkload]) -> anyhow::Result<Vec<FkSuggestion>> {
    let small: std::collections::HashSet<&str> = workload
        .iter()
        .filter(|w| is_small_workload(w.query_count(), FK_SUGGESTION_MIN_QUERIES))
        .map(|w| w.table.as_str())
        .collect();

    let rows = conn
        .query(
            "select conrelid::regclass::text as referencing_table, \
                    confrelid::regclass::text as referenced_table, \
                    array(select attname from pg_attribute \
                          where attrelid = conrelid and attnum = any(conkey) \
                          order by array_position(conkey, attnum)) as columns \
             from pg_constraint c \
             where contype = 'f' \
               and not exists ( \
                 select 1 from pg_index i \
                 where i.indrelid = c.conrelid \
                   and (i.indkey::smallint[])[0:array_length(c.conkey, 1) - 1] = c.conkey::smallint[] \
               )",
            &[],
        )
        .await?;

    let mut suggestions = Vec::new();
    for row in rows {
        let table: String = row.try_get(0)?;
        if small.contains(table.as_str()) {
            continue;
        }
        let referenced_table: String = row.try_get(1)?;
        let columns: Vec<String> = row.try_get(2)?;
        suggestions.push(FkSuggestion { table, columns, referenced_table });
    }
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    // `find_missing` needs a live connection for the catalog query; covered
    // by integration tests against a fake gateway. The small-workload
    // filter itself is exercised by `ix-analyzer::is_small_workload`'s own
    // tests.
}
