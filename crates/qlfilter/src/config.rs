//! Filter engine configuration.
//!
//! Settings live in the `[ql]` table of a TOML file and can be overridden by
//! environment variables:
//!
//! ```toml
//! [ql]
//! ignore_case = true
//! case_insensitive_db = false
//! database = "postgres"
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::filter::{CaseFolding, FilterError, FilterResult};
use crate::sql::Database;

/// Env var overriding [`FilterConfig::ignore_case`].
pub const ENV_IGNORE_CASE: &str = "QLFILTER_IGNORE_CASE";

/// Env var overriding [`FilterConfig::case_insensitive_db`].
pub const ENV_CASE_INSENSITIVE_DB: &str = "QLFILTER_CASE_INSENSITIVE_DB";

/// Env var overriding [`FilterConfig::database`].
pub const ENV_DATABASE: &str = "QLFILTER_DATABASE";

/// Case and backend policy, fixed when the service is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Compare strings without regard to case.
    pub ignore_case: bool,

    /// The database already compares strings case-insensitively.
    pub case_insensitive_db: bool,

    /// Which SQL dialect compiled filters are rendered for.
    pub database: Database,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_case: true,
            case_insensitive_db: false,
            database: Database::Sqlite,
        }
    }
}

/// File layout: everything sits under `[ql]`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ql: FilterConfig,
}

impl FilterConfig {
    /// Parses the `[ql]` table of a TOML document. Missing keys keep their
    /// defaults.
    pub fn from_toml_str(content: &str) -> FilterResult<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| FilterError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(file.ql)
    }

    /// Loads the configuration from a TOML file. A missing file yields the
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no filter config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| FilterError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Applies `QLFILTER_*` environment overrides. Malformed values are
    /// logged and ignored.
    pub fn apply_env(mut self) -> Self {
        if let Some(value) = env_flag(ENV_IGNORE_CASE) {
            self.ignore_case = value;
        }
        if let Some(value) = env_flag(ENV_CASE_INSENSITIVE_DB) {
            self.case_insensitive_db = value;
        }
        if let Ok(raw) = env::var(ENV_DATABASE) {
            match raw.parse::<Database>() {
                Ok(database) => self.database = database,
                Err(e) => tracing::warn!(var = ENV_DATABASE, value = %raw, error = %e, "ignoring override"),
            }
        }
        self
    }

    /// Whether query text is lower-cased before parsing. The in-memory
    /// matcher also folds case when this holds.
    pub fn lower_case_query(&self) -> bool {
        self.ignore_case || self.case_insensitive_db
    }

    /// Whether compiled SQL upper-cases both sides of string comparisons.
    pub fn fold_case_in_sql(&self) -> bool {
        self.ignore_case && !self.case_insensitive_db
    }

    /// The folding applied to query text and by the matcher, following the
    /// configured database so both backends agree on non-ASCII letters.
    /// `None` when comparisons keep case.
    pub fn case_folding(&self) -> Option<CaseFolding> {
        self.lower_case_query().then(|| self.database.dialect().case_folding())
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    match parse_bool(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "ignoring override");
            None
        }
    }
}

/// Parses a boolean value from string.
fn parse_bool(s: &str) -> FilterResult<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(FilterError::Config(format!(
            "Invalid boolean value '{}'. Use true/false, yes/no, 1/0, or on/off",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        env::remove_var(ENV_IGNORE_CASE);
        env::remove_var(ENV_CASE_INSENSITIVE_DB);
        env::remove_var(ENV_DATABASE);
    }

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert!(config.ignore_case);
        assert!(!config.case_insensitive_db);
        assert_eq!(config.database, Database::Sqlite);
    }

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool(" on ").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_from_toml_str_full() {
        let config = FilterConfig::from_toml_str(
            r#"
[ql]
ignore_case = false
case_insensitive_db = true
database = "postgres"
"#,
        )
        .unwrap();
        assert!(!config.ignore_case);
        assert!(config.case_insensitive_db);
        assert_eq!(config.database, Database::Postgres);
    }

    #[test]
    fn test_from_toml_str_partial_and_empty() {
        let config = FilterConfig::from_toml_str("[ql]\ndatabase = \"sqlserver\"\n").unwrap();
        assert!(config.ignore_case);
        assert_eq!(config.database, Database::SqlServer);

        assert_eq!(FilterConfig::from_toml_str("").unwrap(), FilterConfig::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = FilterConfig::from_toml_str("[ql]\ndatabase = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, FilterError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = FilterConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FilterConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ql]\nignore_case = false\n").unwrap();
        let config = FilterConfig::load(&path).unwrap();
        assert!(!config.ignore_case);
    }

    #[test]
    fn test_case_policy() {
        let mut config = FilterConfig::default();
        assert!(config.lower_case_query());
        assert!(config.fold_case_in_sql());

        config.case_insensitive_db = true;
        assert!(config.lower_case_query());
        assert!(!config.fold_case_in_sql());

        config.ignore_case = false;
        assert!(config.lower_case_query());
        assert!(!config.fold_case_in_sql());

        config.case_insensitive_db = false;
        assert!(!config.lower_case_query());
        assert!(!config.fold_case_in_sql());
    }

    #[test]
    fn test_case_folding_follows_database() {
        let mut config = FilterConfig::default();
        assert_eq!(config.case_folding(), Some(CaseFolding::Ascii));

        config.database = Database::Postgres;
        assert_eq!(config.case_folding(), Some(CaseFolding::Unicode));

        config.ignore_case = false;
        assert_eq!(config.case_folding(), None);
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        clear_env();
        env::set_var(ENV_IGNORE_CASE, "false");
        env::set_var(ENV_DATABASE, "mssql");
        let config = FilterConfig::default().apply_env();
        clear_env();

        assert!(!config.ignore_case);
        assert_eq!(config.database, Database::SqlServer);
    }

    #[test]
    #[serial]
    fn test_apply_env_ignores_malformed_values() {
        clear_env();
        env::set_var(ENV_CASE_INSENSITIVE_DB, "sometimes");
        env::set_var(ENV_DATABASE, "oracle");
        let config = FilterConfig::default().apply_env();
        clear_env();

        assert_eq!(config, FilterConfig::default());
    }
}
