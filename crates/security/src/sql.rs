//! Statement policy for `sql_fetch`.
//!
//! Only single read statements get through. The check is textual and runs
//! before the store is touched; the PostgreSQL store additionally executes
//! inside a read-only transaction.

use crate::PolicyError;

pub struct SqlPolicy;

impl SqlPolicy {
    /// Allow a statement only if its trimmed, lower-cased text starts with
    /// `select` and it contains no further statements. A `;` inside a quoted
    /// literal does not count as a separator.
    pub fn check(sql: &str) -> Result<(), PolicyError> {
        let normalized = sql.trim().to_lowercase();
        if !normalized.starts_with("select") {
            return Err(PolicyError::StatementNotAllowed);
        }

        let body = normalized.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
        if has_separator(body) {
            return Err(PolicyError::MultipleStatements);
        }

        Ok(())
    }
}

/// True when `;` appears outside quoted literals and identifiers, or when a
/// quote is left open. A doubled quote inside a literal is an escape, which
/// toggling handles without special casing.
fn has_separator(body: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in body.chars() {
        match (quote, c) {
            (None, ';') => return true,
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    quote.is_some()
}
