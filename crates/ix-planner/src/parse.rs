//! Parses `EXPLAIN (FORMAT JSON)` / `EXPLAIN (ANALYZE, FORMAT JSON)` output
//! into a [`PlanSummary`]. Shape mismatches (missing
//! `"Plan"` key, non-array top level) are reported as `PlanUnavailable`
//! rather than panicking, per §4.4's "tuple index out of range"-style
//! fallback rule.

use ix_domain::{
    PlanNode,
    PlanSummary,
};
use ix_errors::IndexPilotError;

pub fn parse_explain_json(raw: &str) -> anyhow::Result<PlanSummary> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| IndexPilotError::PlanUnavailable(format!("invalid plan JSON: {e}")))?;
    let top = value
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|entry| entry.get("Plan"))
        .ok_or_else(|| IndexPilotError::PlanUnavailable("plan JSON missing top-level \"Plan\" node".into()))?;

    let mut nodes = Vec::new();
    let mut seq_scan_tables = Vec::new();
    let mut chosen_index_names = Vec::new();
    collect_nodes(top, &mut nodes, &mut seq_scan_tables, &mut chosen_index_names);

    let estimated_cost = top.get("Total Cost").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let estimated_rows = top.get("Plan Rows").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let actual_duration_ms = value
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|entry| entry.get("Execution Time"))
        .and_then(|v| v.as_f64());

    let mut top_cost_nodes = nodes;
    top_cost_nodes.sort_by(|a, b| b.estimated_cost.partial_cmp(&a.estimated_cost).unwrap());
    top_cost_nodes.truncate(5);

    seq_scan_tables.sort();
    seq_scan_tables.dedup();
    chosen_index_names.sort();
    chosen_index_names.dedup();

    Ok(PlanSummary {
        estimated_cost,
        estimated_rows,
        seq_scan_tables,
        chosen_index_names,
        top_cost_nodes,
        actual_duration_ms,
    })
}

fn collect_nodes(
    node: &serde_json::Value,
    out: &mut Vec<PlanNode>,
    seq_scan_tables: &mut Vec<String>,
    chosen_index_names: &mut Vec<String>,
) {
    let node_type = node.get("Node Type").and_then(|v| v.as_str()).unwrap_or("Unknown").to_owned();
    let relation = node.get("Relation Name").and_then(|v| v.as_str()).map(str::to_owned);
    let index_name = node.get("Index Name").and_then(|v| v.as_str()).map(str::to_owned);
    let is_seq_scan = node_type == "Seq Scan";
    if is_seq_scan {
        if let Some(rel) = &relation {
            seq_scan_tables.push(rel.clone());
        }
    }
    if let Some(idx) = &index_name {
        chosen_index_names.push(idx.clone());
    }
    out.push(PlanNode {
        node_type,
        relation,
        index_name,
        estimated_cost: node.get("Total Cost").and_then(|v| v.as_f64()).unwrap_or(0.0),
        estimated_rows: node.get("Plan Rows").and_then(|v| v.as_f64()).unwrap_or(0.0),
        is_seq_scan,
    });
    if let Some(children) = node.get("Plans").and_then(|v| v.as_array()) {
        for child in children {
            collect_nodes(child, out, seq_scan_tables, chosen_index_names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sequential_scan_and_cost() {
        let raw = r#"[{
            "Plan": {
                "Node Type": "Seq Scan",
                "Relation Name": "contacts",
                "Total Cost": 1234.5,
                "Plan Rows": 1000
            }
        }]"#;
        let summary = parse_explain_json(raw).unwrap();
        assert_eq!(summary.estimated_cost, 1234.5);
        assert!(summary.touches_sequential_scan("contacts"));
        assert!(summary.chosen_index_names.is_empty());
    }

    #[test]
    fn detects_chosen_index_in_nested_plan() {
        let raw = r#"[{
            "Plan": {
                "Node Type": "Nested Loop",
                "Total Cost": 50.0,
                "Plan Rows": 10,
                "Plans": [
                    {
                        "Node Type": "Index Scan",
                        "Index Name": "contacts_email_idx",
                        "Relation Name": "contacts",
                        "Total Cost": 20.0,
                        "Plan Rows": 5
                    }
                ]
            }
        }]"#;
        let summary = parse_explain_json(raw).unwrap();
        assert_eq!(summary.chosen_index_names, vec!["contacts_email_idx"]);
        assert!(!summary.touches_sequential_scan("contacts"));
    }

    #[test]
    fn malformed_plan_is_reported_as_unavailable() {
        let err = parse_explain_json("not json").unwrap_err();
        assert!(err.downcast_ref::<IndexPilotError>().is_some());
    }

    #[test]
    fn missing_plan_key_is_reported_as_unavailable() {
        let err = parse_explain_json("[{}]").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexPilotError>(),
            Some(IndexPilotError::PlanUnavailable(_))
        ));
    }
}
