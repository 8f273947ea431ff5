//! Relational backend: compiles filter expressions into SQL predicates.
//!
//! [`SpecificationBuilder`] turns a [`FilterExpression`](crate::filter::FilterExpression)
//! into a [`Specification`], which builds a backend-neutral [`SelectQuery`]
//! against an [`EntityType`](crate::schema::EntityType). [`render`] then
//! prints the query for one of the supported [`Database`]s together with its
//! ordered bind parameters.
//!
//! Rows are selected with `DISTINCT` on the root id since joins over
//! collections multiply rows.

mod compiler;
mod dialect;
mod postgres_dialect;
mod predicate;
mod render;
mod resolver;
mod sqlite_dialect;
mod sqlserver_dialect;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::FilterError;

pub use compiler::{Specification, SpecificationBuilder, ROOT_ALIAS};
pub use dialect::SqlDialect;
pub use postgres_dialect::PostgresDialect;
pub use predicate::{ColumnRef, CompareOp, Join, JoinKind, Operand, Predicate, SelectQuery};
pub use render::{render, render_predicate, Rendered};
pub use sqlite_dialect::SqliteDialect;
pub use sqlserver_dialect::SqlServerDialect;

/// Database backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
    Sqlite,
    #[serde(alias = "postgresql")]
    Postgres,
    #[serde(alias = "mssql")]
    SqlServer,
}

impl Database {
    /// Get the SQL dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Database::Sqlite => &SqliteDialect,
            Database::Postgres => &PostgresDialect,
            Database::SqlServer => &SqlServerDialect,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            Database::Sqlite => "sqlite",
            Database::Postgres => "postgres",
            Database::SqlServer => "sqlserver",
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Database {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Database::Sqlite),
            "postgres" | "postgresql" => Ok(Database::Postgres),
            "sqlserver" | "mssql" => Ok(Database::SqlServer),
            other => Err(FilterError::Config(format!(
                "unknown database '{}' (expected sqlite, postgres or sqlserver)",
                other
            ))),
        }
    }
}
