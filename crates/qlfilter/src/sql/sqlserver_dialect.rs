//! SQL Server dialect implementation

use super::dialect::translate_wildcards;
use super::SqlDialect;

/// SQL Server dialect
///
/// LIKE metacharacters are escaped with brackets, so no `ESCAPE` clause is
/// needed.
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn like_pattern(&self, pattern: &str) -> String {
        translate_wildcards(pattern, |c| match c {
            '%' => Some("[%]"),
            '_' => Some("[_]"),
            '[' => Some("[[]"),
            _ => None,
        })
    }

    fn like_escape_clause(&self) -> Option<&'static str> {
        None
    }
}
