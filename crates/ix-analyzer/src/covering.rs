//! Covering-index opportunity detection: a high-frequency `SELECT` list that is a superset of the
//! indexed key suggests an `INCLUDE` list.

#[derive(Debug, Clone, PartialEq)]
pub struct CoveringOpportunity {
    pub key_columns: Vec<String>,
    pub include_columns: Vec<String>,
}

/// `select_list` must be a strict superset of `key_columns` for a covering
/// opportunity to exist; the extra columns become the `INCLUDE` list.
pub fn suggest(key_columns: &[String], select_list: &[String]) -> Option<CoveringOpportunity> {
    if key_columns.is_empty() {
        return None;
    }
    if !key_columns.iter().all(|k| select_list.contains(k)) {
        return None;
    }
    let include_columns: Vec<String> = select_list
        .iter()
        .filter(|c| !key_columns.contains(c))
        .cloned()
        .collect();
    if include_columns.is_empty() {
        return None;
    }
    Some(CoveringOpportunity {
        key_columns: key_columns.to_vec(),
        include_columns,
    })
}
