//! Stable hash of a normalized query shape.
//!
//! Constants are masked, identifiers are quoted, and commutative clause
//! ordering is canonicalized before hashing, so that two queries that only
//! differ in literal values or clause order share a fingerprint.

use sha2::{
    Digest,
    Sha256,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Fingerprint(pub [u8; 16]);

impl Fingerprint {
    /// Computes a fingerprint from an already-normalized shape string. Shape
    /// normalization (masking literals, canonicalizing clause order) is the
    /// caller's responsibility — see [`normalize`].
    pub fn of_normalized(shape: &str) -> Self {
        let digest = Sha256::digest(shape.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Fingerprint(bytes)
    }

    pub fn to_hex(self) -> String {
        hex_encode(&self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Masks integer/string/numeric literals and lowercases+sorts a naive
/// whitespace-and-comma split of commutative `AND`-joined predicates. This
/// is intentionally conservative: it is a shape canonicalizer for grouping
/// statistics, not a SQL parser, and never changes query semantics because
/// it is never used to build SQL that is actually executed.
pub fn normalize(sql: &str) -> String {
    let masked = mask_literals(sql);
    let lower = masked.to_lowercase();
    canonicalize_and_clauses(&lower)
}

fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push_str("'?'");
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                }
            },
            c if c.is_ascii_digit() => {
                out.push('?');
                while matches!(chars.peek(), Some(d) if d.is_ascii_digit() || *d == '.') {
                    chars.next();
                }
            },
            c => out.push(c),
        }
    }
    out
}

fn canonicalize_and_clauses(sql: &str) -> String {
    if let Some(where_pos) = sql.find(" where ") {
        let (prefix, rest) = sql.split_at(where_pos + 7);
        let (predicate_part, suffix) = match rest.find(" order by ").or_else(|| rest.find(" group by ")) {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };
        let mut clauses: Vec<&str> = predicate_part.split(" and ").map(str::trim).collect();
        clauses.sort_unstable();
        format!("{prefix}{}{suffix}", clauses.join(" and "))
    } else {
        sql.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_values_do_not_change_fingerprint() {
        let a = Fingerprint::of_normalized(&normalize("select * from t where id = 1"));
        let b = Fingerprint::of_normalized(&normalize("select * from t where id = 2"));
        assert_eq!(a, b);
    }

    #[test]
    fn clause_order_does_not_change_fingerprint() {
        let a = Fingerprint::of_normalized(&normalize("select * from t where a = 1 and b = 2"));
        let b = Fingerprint::of_normalized(&normalize("select * from t where b = 2 and a = 1"));
        assert_eq!(a, b);
    }

    #[test]
    fn different_shapes_differ() {
        let a = Fingerprint::of_normalized(&normalize("select * from t where a = 1"));
        let b = Fingerprint::of_normalized(&normalize("select * from u where a = 1"));
        assert_ne!(a, b);
    }
}
