//! Abstract Syntax Tree (AST) for filter expressions.
//!
//! A [`FilterExpression`] is always kept in disjunctive normal form: a single
//! comparison, an AND of comparisons, or an OR whose branches are comparisons
//! or ANDs of comparisons. [`FilterExpression::and`] and
//! [`FilterExpression::or`] are the only ways to combine expressions and both
//! preserve that shape, so code walking the tree may rely on it.

use std::borrow::Cow;
use std::fmt;

use super::error::{FilterError, FilterResult};
use super::parser::has_unescaped_wildcard;
use super::value::Literal;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `like`
    Like,
    /// `not like`
    NotLike,
}

impl Operator {
    /// The operator as written in a query.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }

    /// `!=`, `not in` and `not like`.
    pub fn is_negative(self) -> bool {
        matches!(self, Operator::Ne | Operator::NotIn | Operator::NotLike)
    }

    /// The positive counterpart of a negative operator; positive operators
    /// map to themselves.
    pub fn positive(self) -> Operator {
        match self {
            Operator::Ne => Operator::Eq,
            Operator::NotIn => Operator::In,
            Operator::NotLike => Operator::Like,
            other => other,
        }
    }

    /// `>`, `>=`, `<` and `<=`.
    pub fn is_ordering(self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte)
    }

    /// `in` and `not in`.
    pub fn is_membership(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// `like` and `not like`.
    pub fn is_pattern(self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single `key op value` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    key: String,
    op: Operator,
    value: Literal,
    context: Option<String>,
}

impl Comparison {
    /// Creates a comparison, validating the key and the value's shape.
    ///
    /// # Errors
    ///
    /// - the key is blank,
    /// - `null` is given to `>`, `<`, `like` or `not like`,
    /// - a list is given to an operator other than `in` / `not in`,
    /// - a list is empty or mixes strings with numbers.
    ///
    /// `==` and `!=` with a string holding an unescaped `*` become `like` and
    /// `not like`, as they do in query text.
    pub fn new(key: impl AsRef<str>, op: Operator, value: impl Into<Literal>) -> FilterResult<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(FilterError::unsupported_field(key, "key must not be empty"));
        }
        let value = value.into();

        match &value {
            Literal::Null
                if matches!(op, Operator::Gt | Operator::Lt | Operator::Like | Operator::NotLike) =>
            {
                return Err(FilterError::unsupported_operator(key, op, "value must not be null"));
            }
            Literal::List(items) => {
                if !op.is_membership() {
                    return Err(FilterError::value_arity(key, op, "expects a single value, not a list"));
                }
                if items.is_empty() {
                    return Err(FilterError::value_arity(key, op, "requires at least one value"));
                }
                let all_strings = items.iter().all(|i| matches!(i, Literal::Str(_)));
                let all_numbers = items
                    .iter()
                    .all(|i| matches!(i, Literal::Int(_) | Literal::Float(_)));
                if !all_strings && !all_numbers {
                    return Err(FilterError::type_coercion(
                        key,
                        value.to_string(),
                        "list of strings or list of numbers",
                    ));
                }
            }
            _ => {}
        }

        Ok(Self {
            key: key.to_string(),
            op: pattern_op(op, &value),
            value,
            context: None,
        })
    }

    /// Attaches a free-form context (usually the key as the user typed it),
    /// used in error messages instead of the key.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Dot-separated field path.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The operator.
    pub fn op(&self) -> Operator {
        self.op
    }

    /// The literal value.
    pub fn value(&self) -> &Literal {
        &self.value
    }

    /// The context, if one was attached.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The name used when reporting errors: the context if set, otherwise the key.
    pub fn path_context(&self) -> &str {
        self.context.as_deref().unwrap_or(&self.key)
    }

    /// Returns a copy with a different key, keeping operator, value and context.
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Returns a copy with a different value, keeping key, operator and context.
    pub fn with_value(&self, value: impl Into<Literal>) -> Self {
        let value = value.into();
        Self {
            op: pattern_op(self.op, &value),
            value,
            ..self.clone()
        }
    }
}

fn pattern_op(op: Operator, value: &Literal) -> Operator {
    let wildcard = value.as_str().is_some_and(has_unescaped_wildcard);
    match op {
        Operator::Eq if wildcard => Operator::Like,
        Operator::Ne if wildcard => Operator::NotLike,
        other => other,
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.op, self.value)
    }
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
}

/// A conjunction or disjunction of at least two expressions.
///
/// Only constructed through [`FilterExpression::and`] / [`FilterExpression::or`],
/// so the children are always flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct Logical {
    op: LogicalOp,
    children: Vec<FilterExpression>,
}

impl Logical {
    /// The combinator.
    pub fn op(&self) -> LogicalOp {
        self.op
    }

    /// The children, in order. Always two or more.
    pub fn children(&self) -> &[FilterExpression] {
        &self.children
    }
}

/// A parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// A single comparison.
    Comparison(Comparison),
    /// An AND or OR node.
    Logical(Logical),
}

impl From<Comparison> for FilterExpression {
    fn from(value: Comparison) -> Self {
        FilterExpression::Comparison(value)
    }
}

impl FilterExpression {
    /// Creates a single-comparison expression.
    ///
    /// # Example
    ///
    /// ```
    /// use qlfilter_rs::filter::{FilterExpression, Operator};
    ///
    /// let status = FilterExpression::comparison("status", Operator::Eq, "closed").unwrap();
    /// let name = FilterExpression::comparison("name", Operator::Like, "dev*").unwrap();
    /// assert_eq!(status.and(name).to_string(), r#"status == "closed" and name like "dev*""#);
    /// ```
    pub fn comparison(
        key: impl AsRef<str>,
        op: Operator,
        value: impl Into<Literal>,
    ) -> FilterResult<Self> {
        Comparison::new(key, op, value).map(FilterExpression::Comparison)
    }

    /// Conjunction of `self` and `other`.
    ///
    /// Nested ANDs are flattened and AND is distributed over OR, so the result
    /// stays in disjunctive normal form.
    pub fn and(self, other: FilterExpression) -> FilterExpression {
        let left = self.into_disjuncts();
        let right = other.into_disjuncts();
        let mut branches = Vec::with_capacity(left.len() * right.len());
        for l in &left {
            for r in &right {
                let mut terms = l.clone().into_conjuncts();
                terms.extend(r.clone().into_conjuncts());
                branches.push(Self::combine(LogicalOp::And, terms));
            }
        }
        Self::combine(LogicalOp::Or, branches)
    }

    /// Disjunction of `self` and `other`. Nested ORs are flattened.
    pub fn or(self, other: FilterExpression) -> FilterExpression {
        let mut branches = self.into_disjuncts();
        branches.extend(other.into_disjuncts());
        Self::combine(LogicalOp::Or, branches)
    }

    /// Rewrites every comparison leaf.
    ///
    /// `transform` returns `Some` with a replacement or `None` to keep the
    /// leaf. When no leaf is replaced the expression itself is returned
    /// borrowed, so `matches!(result, Cow::Borrowed(_))` tells whether
    /// anything changed.
    pub fn map<F>(&self, mut transform: F) -> Cow<'_, FilterExpression>
    where
        F: FnMut(&Comparison) -> Option<Comparison>,
    {
        self.map_with(&mut transform)
    }

    fn map_with<F>(&self, transform: &mut F) -> Cow<'_, FilterExpression>
    where
        F: FnMut(&Comparison) -> Option<Comparison>,
    {
        match self {
            FilterExpression::Comparison(c) => match transform(c) {
                Some(replaced) => Cow::Owned(FilterExpression::Comparison(replaced)),
                None => Cow::Borrowed(self),
            },
            FilterExpression::Logical(logical) => {
                let mapped: Vec<Cow<'_, FilterExpression>> = logical
                    .children
                    .iter()
                    .map(|child| child.map_with(transform))
                    .collect();
                if mapped.iter().all(|c| matches!(c, Cow::Borrowed(_))) {
                    return Cow::Borrowed(self);
                }
                Cow::Owned(FilterExpression::Logical(Logical {
                    op: logical.op,
                    children: mapped.into_iter().map(Cow::into_owned).collect(),
                }))
            }
        }
    }

    /// Visits every comparison leaf, left to right.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            FilterExpression::Comparison(c) => out.push(c),
            FilterExpression::Logical(l) => {
                for child in &l.children {
                    child.collect_comparisons(out);
                }
            }
        }
    }

    /// Depth of the tree: 1 for a comparison.
    pub fn depth(&self) -> usize {
        match self {
            FilterExpression::Comparison(_) => 1,
            FilterExpression::Logical(l) => {
                1 + l.children.iter().map(FilterExpression::depth).max().unwrap_or(0)
            }
        }
    }

    fn into_disjuncts(self) -> Vec<FilterExpression> {
        match self {
            FilterExpression::Logical(Logical {
                op: LogicalOp::Or,
                children,
            }) => children,
            other => vec![other],
        }
    }

    fn into_conjuncts(self) -> Vec<FilterExpression> {
        match self {
            FilterExpression::Logical(Logical {
                op: LogicalOp::And,
                children,
            }) => children,
            other => vec![other],
        }
    }

    /// Wraps `children` in a node, collapsing a single child to itself.
    fn combine(op: LogicalOp, mut children: Vec<FilterExpression>) -> FilterExpression {
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        FilterExpression::Logical(Logical { op, children })
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpression::Comparison(c) => write!(f, "{}", c),
            FilterExpression::Logical(l) => {
                for (i, child) in l.children.iter().enumerate() {
                    match l.op {
                        LogicalOp::And => {
                            if i > 0 {
                                write!(f, " and ")?;
                            }
                            write!(f, "{}", child)?;
                        }
                        LogicalOp::Or => {
                            if i > 0 {
                                write!(f, " or ")?;
                            }
                            match child {
                                FilterExpression::Logical(_) => write!(f, "({})", child)?,
                                FilterExpression::Comparison(_) => write!(f, "{}", child)?,
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
