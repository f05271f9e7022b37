//! Risk signal extraction: turns a `planFast`
//! result plus the raw SQL text into a handful of named signals, then folds
//! them into a single heuristic score in `[0, 1]`. Pure and DB-free so it is
//! exhaustively unit tested; the live connection only has to produce a
//! `PlanSummary` and a row-count map, both already on hand by the time
//! `QueryInterceptor::check` calls in here.

use std::collections::HashMap;

use ix_domain::PlanSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskSignals {
    pub estimated_cost: f64,
    pub seq_scan_over_large_table: bool,
    pub missing_where_on_large_table: bool,
    pub likely_cartesian_join: bool,
    pub unbounded_like: bool,
    pub subquery_join_depth: u32,
    pub missing_limit: bool,
}

fn contains_keyword(sql_lower: &str, keyword: &str) -> bool {
    sql_lower.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == keyword)
}

fn touches_large_table(tables: &[String], row_counts: &HashMap<String, u64>, threshold: u64) -> bool {
    tables.iter().any(|t| row_counts.get(t).copied().unwrap_or(0) >= threshold)
}

/// Naive FROM-clause scan: more than one table named directly after `from`
/// with no `join` keyword anywhere in the statement is the classic implicit
/// cross join shape (`from a, b where ...` with no join predicate, or no
/// predicate at all).
fn looks_like_cartesian_join(sql_lower: &str) -> bool {
    if contains_keyword(sql_lower, "join") {
        return false;
    }
    let Some(from_idx) = sql_lower.find(" from ") else {
        return false;
    };
    let rest = &sql_lower[from_idx + 6..];
    let clause_end = ["where", "group", "order", "limit", ";"]
        .iter()
        .filter_map(|kw| rest.find(&format!(" {kw}")))
        .min()
        .unwrap_or(rest.len());
    rest[..clause_end].matches(',').count() >= 1
}

fn has_unbounded_like(sql_lower: &str) -> bool {
    sql_lower.contains("like '%") || sql_lower.contains("ilike '%")
}

fn subquery_join_depth(sql_lower: &str) -> u32 {
    let selects = sql_lower.matches("select").count().saturating_sub(1) as u32;
    let joins = sql_lower.matches(" join ").count() as u32;
    selects + joins
}

/// Extracts [`RiskSignals`] from `sql` and `plan`. `row_counts` maps table
/// name to estimated live row count (from `pg_stat_user_tables`, kept by the
/// caller); a table absent from the map is treated as small.
pub fn extract(sql: &str, plan: &PlanSummary, row_counts: &HashMap<String, u64>, large_table_row_threshold: u64) -> RiskSignals {
    let sql_lower = sql.to_lowercase();
    RiskSignals {
        estimated_cost: plan.estimated_cost,
        seq_scan_over_large_table: touches_large_table(&plan.seq_scan_tables, row_counts, large_table_row_threshold),
        missing_where_on_large_table: !contains_keyword(&sql_lower, "where")
            && touches_large_table(&plan.seq_scan_tables, row_counts, large_table_row_threshold),
        likely_cartesian_join: looks_like_cartesian_join(&sql_lower),
        unbounded_like: has_unbounded_like(&sql_lower),
        subquery_join_depth: subquery_join_depth(&sql_lower),
        missing_limit: !contains_keyword(&sql_lower, "limit"),
    }
}

const COST_WEIGHT: f64 = 0.3;
const SEQ_SCAN_WEIGHT: f64 = 0.2;
const MISSING_WHERE_WEIGHT: f64 = 0.2;
const CARTESIAN_WEIGHT: f64 = 0.25;
const UNBOUNDED_LIKE_WEIGHT: f64 = 0.1;
const DEPTH_WEIGHT: f64 = 0.1;
const MISSING_LIMIT_WEIGHT: f64 = 0.05;

/// Folds `signals` into `[0, 1]`. `cost_ceiling` normalizes `estimated_cost`:
/// a plan at or above the ceiling contributes its full weight, scaling down
/// linearly below it. The weights below intentionally do not sum to 1 — a
/// query tripping every signal at once should score near the top of the
/// range, not exactly at it, so `combined` clamps.
pub fn heuristic_score(signals: &RiskSignals, cost_ceiling: f64) -> f64 {
    let cost_component = if cost_ceiling > 0.0 {
        (signals.estimated_cost / cost_ceiling).min(1.0)
    } else {
        0.0
    };
    let mut score = cost_component * COST_WEIGHT;
    if signals.seq_scan_over_large_table {
        score += SEQ_SCAN_WEIGHT;
    }
    if signals.missing_where_on_large_table {
        score += MISSING_WHERE_WEIGHT;
    }
    if signals.likely_cartesian_join {
        score += CARTESIAN_WEIGHT;
    }
    if signals.unbounded_like {
        score += UNBOUNDED_LIKE_WEIGHT;
    }
    score += (signals.subquery_join_depth as f64 / 4.0).min(1.0) * DEPTH_WEIGHT;
    if signals.missing_limit {
        score += MISSING_LIMIT_WEIGHT;
    }
    score.clamp(0.0, 1.0)
}

/// The fixed-order feature vector `scorer::RiskScorer` trains and predicts
/// over — kept alongside `heuristic_score` since both read the same signals.
pub fn vectorize(signals: &RiskSignals, cost_ceiling: f64) -> [f64; 6] {
    let cost_component = if cost_ceiling > 0.0 {
        (signals.estimated_cost / cost_ceiling).min(1.0)
    } else {
        0.0
    };
    [
        cost_component,
        if signals.seq_scan_over_large_table { 1.0 } else { 0.0 },
        if signals.missing_where_on_large_table { 1.0 } else { 0.0 },
        if signals.likely_cartesian_join { 1.0 } else { 0.0 },
        if signals.unbounded_like { 1.0 } else { 0.0 },
        (signals.subquery_join_depth as f64 / 4.0).min(1.0),
    ]
}

#[cfg(test)]
mod tests {
    use ix_domain::PlanSummary;

    use super::*;

    fn plan(cost: f64, seq_scan_tables: &[&str]) -> PlanSummary {
        PlanSummary {
            estimated_cost: cost,
            estimated_rows: 100.0,
            seq_scan_tables: seq_scan_tables.iter().map(|s| s.to_string()).collect(),
            chosen_index_names: vec![],
            top_cost_nodes: vec![],
            actual_duration_ms: None,
        }
    }

    #[test]
    fn a_cheap_bounded_query_scores_low() {
        let row_counts = HashMap::new();
        let p = plan(10.0, &[]);
        let signals = extract("select id from users where id = $1 limit 1", &p, &row_counts, 100_000);
        let score = heuristic_score(&signals, 100_000.0);
        assert!(score < 0.1, "score was {score}");
    }

    #[test]
    fn a_seq_scan_over_a_large_table_is_flagged() {
        let row_counts = HashMap::from([("events".to_string(), 5_000_000u64)]);
        let p = plan(50.0, &["events"]);
        let signals = extract("select * from events where id = $1 limit 100", &p, &row_counts, 100_000);
        assert!(signals.seq_scan_over_large_table);
        assert!(!signals.missing_where_on_large_table, "this query has a where clause");
    }

    #[test]
    fn a_missing_where_on_a_large_table_is_flagged() {
        let row_counts = HashMap::from([("events".to_string(), 5_000_000u64)]);
        let p = plan(50.0, &["events"]);
        let signals = extract("select * from events", &p, &row_counts, 100_000);
        assert!(signals.missing_where_on_large_table);
        assert!(signals.missing_limit);
    }

    #[test]
    fn an_implicit_cross_join_is_flagged() {
        let row_counts = HashMap::new();
        let p = plan(50.0, &[]);
        let signals = extract("select * from a, b", &p, &row_counts, 100_000);
        assert!(signals.likely_cartesian_join);
    }

    #[test]
    fn an_explicit_join_is_not_flagged_as_cartesian() {
        let row_counts = HashMap::new();
        let p = plan(50.0, &[]);
        let signals = extract("select * from a join b on a.id = b.a_id", &p, &row_counts, 100_000);
        assert!(!signals.likely_cartesian_join);
    }

    #[test]
    fn an_unbounded_like_is_flagged() {
        let row_counts = HashMap::new();
        let p = plan(10.0, &[]);
        let signals = extract("select * from users where name like '%smith%'", &p, &row_counts, 100_000);
        assert!(signals.unbounded_like);
    }

    #[test]
    fn a_prefix_like_is_not_flagged() {
        let row_counts = HashMap::new();
        let p = plan(10.0, &[]);
        let signals = extract("select * from users where name like 'smith%'", &p, &row_counts, 100_000);
        assert!(!signals.unbounded_like);
    }

    #[test]
    fn a_query_tripping_every_signal_scores_near_the_top() {
        let row_counts = HashMap::from([("a".to_string(), 10_000_000u64)]);
        let p = plan(1_000_000.0, &["a"]);
        let signals = extract("select * from a, (select * from b where x like '%y%')", &p, &row_counts, 100_000);
        let score = heuristic_score(&signals, 100_000.0);
        assert!(score > 0.8, "score was {score}");
    }
}
