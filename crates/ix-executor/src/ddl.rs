//! Pure DDL statement builders. Grounded on
//! `ix-gateway::identifier`: every name is quoted through [`Ident`], values
//! never interpolated, predicates and include-lists built only from typed
//! `CanonicalField`-derived data (never raw end-user input) before reaching
//! here.

use ix_domain::IndexCandidate;
use ix_gateway::Ident;

/// `CREATE INDEX [CONCURRENTLY] name ON table USING kind (cols) [INCLUDE
/// (...)] [WHERE predicate]`.
pub fn build_create_index_sql(candidate: &IndexCandidate, name: &str, concurrently: bool) -> anyhow::Result<String> {
    let name_ident = Ident::new(name)?;
    let table_ident = Ident::new(&candidate.scope.table)?;
    let cols = candidate
        .columns
        .iter()
        .map(|c| Ident::new(c).map(|i| i.as_quoted().to_owned()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!cols.is_empty(), "index candidate has no columns");

    let mut sql = format!(
        "create index{} {} on {} using {} ({})",
        if concurrently { " concurrently" } else { "" },
        name_ident,
        table_ident,
        candidate.kind.as_sql(),
        cols.join(", "),
    );
    if !candidate.include.is_empty() {
        let include = candidate
            .include
            .iter()
            .map(|c| Ident::new(c).map(|i| i.as_quoted().to_owned()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        sql.push_str(&format!(" include ({})", include.join(", ")));
    }
    if let Some(predicate) = &candidate.predicate {
        sql.push_str(&format!(" where {predicate}"));
    }
    Ok(sql)
}

/// `DROP INDEX [CONCURRENTLY] IF EXISTS name`.
pub fn build_drop_index_sql(name: &str, concurrently: bool) -> anyhow::Result<String> {
    let name_ident = Ident::new(name)?;
    Ok(format!(
        "drop index{} if exists {}",
        if concurrently { " concurrently" } else { "" },
        name_ident
    ))
}

/// `REINDEX INDEX CONCURRENTLY name`, used by `ix-lifecycle`'s bloat task
///.
pub fn build_reindex_concurrently_sql(name: &str) -> anyhow::Result<String> {
    let name_ident = Ident::new(name)?;
    Ok(format!("reindex index concurrently {name_ident}"))
}
