//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for generating database-specific SQL syntax.

use crate::filter::{CaseFolding, ESCAPE_CHAR, LIKE_WILDCARD};

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1 vs @p1)
/// - Identifier quoting
/// - Escaping of LIKE metacharacters
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    /// - SQL Server: Returns "@p1", "@p2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Quote a table, alias or column name
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Translate a filter pattern (`*` wildcard, `\*` literal star) into a
    /// LIKE pattern, escaping the database's own wildcards
    ///
    /// The default escapes `%`, `_` and `\` with a backslash.
    fn like_pattern(&self, pattern: &str) -> String {
        translate_wildcards(pattern, |c| match c {
            '%' => Some("\\%"),
            '_' => Some("\\_"),
            '\\' => Some("\\\\"),
            _ => None,
        })
    }

    /// The `ESCAPE` clause that goes with [`SqlDialect::like_pattern`], if any
    fn like_escape_clause(&self) -> Option<&'static str> {
        Some(" ESCAPE '\\'")
    }

    /// Upper-case an expression
    fn upper(&self, expr: &str) -> String {
        format!("UPPER({})", expr)
    }

    /// How the database's `UPPER` folds text
    fn case_folding(&self) -> CaseFolding {
        CaseFolding::Unicode
    }
}

/// Rewrites `*` to `%` and `\*` to a literal `*`, passing every other
/// character through `escape` first.
pub(crate) fn translate_wildcards<F>(pattern: &str, escape: F) -> String
where
    F: Fn(char) -> Option<&'static str>,
{
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR && chars.peek() == Some(&LIKE_WILDCARD) {
            chars.next();
            out.push(LIKE_WILDCARD);
        } else if c == LIKE_WILDCARD {
            out.push('%');
        } else if let Some(escaped) = escape(c) {
            out.push_str(escaped);
        } else {
            out.push(c);
        }
    }
    out
}
