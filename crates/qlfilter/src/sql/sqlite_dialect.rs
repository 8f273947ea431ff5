//! SQLite SQL dialect implementation

use super::SqlDialect;
use crate::filter::CaseFolding;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // built-in UPPER only knows ASCII letters
    fn case_folding(&self) -> CaseFolding {
        CaseFolding::Ascii
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.placeholder(1), "?");
        assert_eq!(dialect.placeholder(5), "?");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.like_pattern("100%_*"), "100\\%\\_%");
        assert_eq!(dialect.like_pattern(r"a\*b*"), "a*b%");
        assert_eq!(dialect.like_pattern(r"C:\dir"), r"C:\\dir");
    }

    #[test]
    fn test_case_folding_is_ascii() {
        assert_eq!(SqliteDialect.case_folding(), CaseFolding::Ascii);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqliteDialect.quote_identifier("name"), "\"name\"");
        assert_eq!(SqliteDialect.quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
