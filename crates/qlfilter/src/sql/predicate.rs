//! Backend-neutral predicate tree and select query.
//!
//! The compiler produces these types; [`super::render`] turns them into SQL
//! text for a given dialect.

use crate::filter::Scalar;

/// A column of a table alias in the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table alias.
    pub alias: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Creates a column reference.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A column.
    Column(ColumnRef),
    /// A bound parameter.
    Param(Scalar),
    /// `UPPER(operand)`.
    Upper(Box<Operand>),
}

impl Operand {
    /// Wraps in `UPPER(..)` when `fold` is set.
    pub fn folded(self, fold: bool) -> Operand {
        if fold {
            Operand::Upper(Box::new(self))
        } else {
            self
        }
    }
}

impl From<ColumnRef> for Operand {
    fn from(value: ColumnRef) -> Self {
        Operand::Column(value)
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl CompareOp {
    /// SQL spelling.
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// All must hold. An empty list is true.
    And(Vec<Predicate>),
    /// At least one must hold. An empty list is false.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// `operand IS NULL`
    IsNull(Operand),
    /// `operand IS NOT NULL`
    IsNotNull(Operand),
    /// `left op right`
    Compare {
        /// Left side.
        left: Operand,
        /// Operator.
        op: CompareOp,
        /// Right side.
        right: Operand,
    },
    /// `operand IN (values..)`
    In {
        /// Tested operand.
        operand: Operand,
        /// Candidate values.
        values: Vec<Operand>,
    },
    /// `operand LIKE pattern`, the pattern written with `*` wildcards and
    /// `\*` for a literal star; dialects translate it.
    Like {
        /// Tested operand.
        operand: Operand,
        /// Pattern in filter syntax.
        pattern: String,
        /// Whether the pattern is compared upper-cased.
        upper: bool,
    },
    /// `EXISTS (subquery)`
    Exists(Box<SelectQuery>),
}

impl Predicate {
    /// Conjunction that drops nesting of single children.
    pub fn all(mut parts: Vec<Predicate>) -> Predicate {
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return only;
            }
        }
        Predicate::And(parts)
    }

    /// Disjunction that drops nesting of single children.
    pub fn any(mut parts: Vec<Predicate>) -> Predicate {
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return only;
            }
        }
        Predicate::Or(parts)
    }

    /// `NOT (self)`.
    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// `left = right`.
    pub fn eq(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
        Predicate::Compare {
            left: left.into(),
            op: CompareOp::Eq,
            right: right.into(),
        }
    }
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
}

/// A joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Joined table.
    pub table: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Join condition.
    pub on: Predicate,
}

/// `SELECT [DISTINCT] columns FROM table alias joins WHERE filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Root table.
    pub table: String,
    /// Root alias.
    pub alias: String,
    /// Selected columns; empty selects `1`.
    pub columns: Vec<ColumnRef>,
    /// Joins in order.
    pub joins: Vec<Join>,
    /// Where clause.
    pub filter: Option<Predicate>,
    /// Whether duplicate rows are removed.
    pub distinct: bool,
}

impl SelectQuery {
    /// `SELECT 1 FROM table alias`, used for subqueries.
    pub fn probe(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            filter: None,
            distinct: false,
        }
    }
}
