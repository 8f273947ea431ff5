//! Prints [`SelectQuery`] and [`Predicate`] trees as SQL text.
//!
//! Parameters are numbered in the order they appear in the text, so joins
//! (whose `ON` clauses may hold parameters) come before the `WHERE` clause.

use super::predicate::{Join, JoinKind, Operand, Predicate, SelectQuery};
use super::SqlDialect;
use crate::filter::Scalar;

/// SQL text with its bind parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// The statement.
    pub sql: String,
    /// Values for the placeholders, first to last.
    pub params: Vec<Scalar>,
}

/// Renders a full select statement.
pub fn render(query: &SelectQuery, dialect: &dyn SqlDialect) -> Rendered {
    let mut writer = SqlWriter::new(dialect);
    writer.query(query);
    writer.finish()
}

/// Renders a bare condition, e.g. to splice into a hand-written statement.
pub fn render_predicate(predicate: &Predicate, dialect: &dyn SqlDialect) -> Rendered {
    let mut writer = SqlWriter::new(dialect);
    writer.predicate(predicate);
    writer.finish()
}

struct SqlWriter<'d> {
    dialect: &'d dyn SqlDialect,
    sql: String,
    params: Vec<Scalar>,
}

impl<'d> SqlWriter<'d> {
    fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn finish(self) -> Rendered {
        Rendered {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn ident(&mut self, ident: &str) {
        let quoted = self.dialect.quote_identifier(ident);
        self.push(&quoted);
    }

    fn param(&mut self, value: Scalar) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.push(&placeholder);
    }

    fn query(&mut self, query: &SelectQuery) {
        self.push("SELECT ");
        if query.distinct {
            self.push("DISTINCT ");
        }
        if query.columns.is_empty() {
            self.push("1");
        }
        for (i, column) in query.columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(&column.alias);
            self.push(".");
            self.ident(&column.column);
        }
        self.push(" FROM ");
        self.ident(&query.table);
        self.push(" ");
        self.ident(&query.alias);
        for join in &query.joins {
            self.join(join);
        }
        if let Some(filter) = &query.filter {
            self.push(" WHERE ");
            self.predicate(filter);
        }
    }

    fn join(&mut self, join: &Join) {
        self.push(match join.kind {
            JoinKind::Inner => " INNER JOIN ",
            JoinKind::Left => " LEFT JOIN ",
        });
        self.ident(&join.table);
        self.push(" ");
        self.ident(&join.alias);
        self.push(" ON ");
        self.predicate(&join.on);
    }

    fn operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Column(column) => {
                self.ident(&column.alias);
                self.push(".");
                self.ident(&column.column);
            }
            Operand::Param(value) => self.param(value.clone()),
            Operand::Upper(inner) => {
                let mut nested = SqlWriter::new(self.dialect);
                nested.params = std::mem::take(&mut self.params);
                nested.operand(inner);
                let upper = self.dialect.upper(&nested.sql);
                self.params = nested.params;
                self.push(&upper);
            }
        }
    }

    /// Writes a child of AND/OR, parenthesized when it is itself a junction.
    fn grouped(&mut self, predicate: &Predicate) {
        if matches!(predicate, Predicate::And(p) | Predicate::Or(p) if p.len() > 1) {
            self.push("(");
            self.predicate(predicate);
            self.push(")");
        } else {
            self.predicate(predicate);
        }
    }

    fn junction(&mut self, parts: &[Predicate], separator: &str, empty: &str) {
        if parts.is_empty() {
            self.push(empty);
            return;
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            self.grouped(part);
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::And(parts) => self.junction(parts, " AND ", "1 = 1"),
            Predicate::Or(parts) => self.junction(parts, " OR ", "1 = 0"),
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner);
                self.push(")");
            }
            Predicate::IsNull(operand) => {
                self.operand(operand);
                self.push(" IS NULL");
            }
            Predicate::IsNotNull(operand) => {
                self.operand(operand);
                self.push(" IS NOT NULL");
            }
            Predicate::Compare { left, op, right } => {
                self.operand(left);
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.operand(right);
            }
            Predicate::In { operand, values } => {
                self.operand(operand);
                self.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.operand(value);
                }
                self.push(")");
            }
            Predicate::Like {
                operand,
                pattern,
                upper,
            } => {
                self.operand(operand);
                self.push(" LIKE ");
                let pattern = Operand::Param(Scalar::Str(self.dialect.like_pattern(pattern)));
                self.operand(&pattern.folded(*upper));
                if let Some(escape) = self.dialect.like_escape_clause() {
                    self.push(escape);
                }
            }
            Predicate::Exists(query) => {
                self.push("EXISTS (");
                self.query(query);
                self.push(")");
            }
        }
    }
}
