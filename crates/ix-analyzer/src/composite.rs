//! Composite-index opportunity detection. Two fields
//! frequently co-appearing in `WHERE` are detected by co-occurrence
//! frequency; `QuerySample::field` carries a `+`-joined composite key for
//! queries that filter on more than one column (see
//! `ix_domain::query_sample`).

use ix_domain::QuerySample;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOpportunity {
    pub table: String,
    pub fields: Vec<String>,
    pub co_occurrence_count: u64,
}

/// Groups samples whose `field` is a `+`-joined composite key by
/// (table, fields) and keeps groups meeting `min_count`. `plan_eliminates_seq_scan`
/// lets a caller additionally require plan evidence (§4.5: "plus plan
/// evidence of sequential scan eliminated by a synthetic composite") before
/// surfacing the opportunity; pass `true` unconditionally to skip that gate.
pub fn detect(samples: &[QuerySample], min_count: u64, plan_eliminates_seq_scan: bool) -> Vec<CompositeOpportunity> {
    if !plan_eliminates_seq_scan {
        return Vec::new();
    }
    let mut counts: std::collections::HashMap<(String, Vec<String>), u64> = std::collections::HashMap::new();
    for sample in samples {
        if !sample.field.contains('+') {
            continue;
        }
        let mut fields: Vec<String> = sample.field.split('+').map(str::to_owned).collect();
        fields.sort();
        *counts.entry((sample.table.clone(), fields)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .map(|((table, fields), co_occurrence_count)| CompositeOpportunity {
            table,
            fields,
            co_occurrence_count,
        })
        .collect()
}
