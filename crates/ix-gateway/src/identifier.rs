//! Identifier quoting is kept as a distinct API from parameter binding:
//! execution is always parameter-bound, and identifier quoting is a
//! separate API. Never build a query by interpolating a value as though it
//! were an identifier, and never quote a value as though it were an
//! identifier.

use postgres_protocol::escape::{
    escape_identifier,
    escape_literal,
};

/// A table, column, or index name that has been validated and quoted for
/// safe interpolation into SQL text. The only way to obtain one is through
/// [`Ident::new`], which rejects names containing a NUL byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(raw: &str) -> anyhow::Result<Self> {
        anyhow::ensure!(!raw.contains('\0'), "identifier contains a NUL byte");
        anyhow::ensure!(!raw.is_empty(), "identifier is empty");
        Ok(Self(escape_identifier(raw)))
    }

    pub fn as_quoted(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quoted string literal, for the rare DDL position (e.g. partial-index
/// predicates) where a value must appear in SQL text rather than as a bound
/// parameter. Still never used for anything that came from end-user input
/// directly; callers build predicates from typed `CanonicalField` data.
pub fn quote_literal(raw: &str) -> String {
    escape_literal(raw)
}
