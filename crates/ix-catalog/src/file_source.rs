//! `load-file` bootstrap source, used in tests and local
//! development where a live database is unavailable. Parses a small JSON
//! document into the same [`CanonicalField`] set `introspection` produces
//! from a live catalog, so `ix-catalog::bootstrap` doesn't branch on shape
//! downstream of this function.

use ix_domain::CanonicalField;

pub fn load_fields(json: &str) -> anyhow::Result<Vec<CanonicalField>> {
    let fields: Vec<CanonicalField> = serde_json::from_str(json)?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_document() {
        let json = r#"[
            {"table": "contacts", "field": "email", "physical_type": "Text", "indexable": true, "tags": []}
        ]"#;
        let fields = load_fields(json).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].table, "contacts");
    }
}
