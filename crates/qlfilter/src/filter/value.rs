//! Filter literals, runtime scalars and coercion between them.
//!
//! A [`Literal`] is what a filter expression carries: the raw value written by
//! the caller. A [`Scalar`] is a typed runtime value, produced by coercing a
//! literal (or a value read from an entity) into a field's declared
//! [`ValueType`]. Both backends coerce through the same functions here so they
//! agree on what a literal means.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use super::ast::{Comparison, Operator};
use super::error::{FilterError, FilterResult};

/// The value side of a comparison, as written in the filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// An integral number.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A non-empty list of strings or numbers (only for `in` / `not in`).
    List(Vec<Literal>),
}

impl Literal {
    /// Builds a list literal.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Literal>,
    {
        Literal::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns true for `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Returns the string if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a non-list literal into an untyped scalar.
    fn to_scalar(&self) -> Scalar {
        match self {
            Literal::Null => Scalar::Null,
            Literal::Bool(b) => Scalar::Bool(*b),
            Literal::Int(i) => Scalar::Int(*i),
            Literal::Float(f) => Scalar::Float(*f),
            Literal::Str(s) => Scalar::Str(s.clone()),
            // Lists are flattened by the caller.
            Literal::List(_) => Scalar::Null,
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            // Debug keeps the decimal point ("1.0" rather than "1").
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A named enumeration with a closed set of values.
///
/// Values are matched by name, ignoring case; the canonical spelling is the
/// one given when the enum was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    variants: Arc<[String]>,
}

impl EnumType {
    /// Declares an enum type.
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// The enum's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared variant names.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Finds the canonical variant for a name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// Text.
    String,
    /// `true` / `false`.
    Boolean,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// One of a closed set of names.
    Enum(EnumType),
    /// A UTC instant, stored as epoch milliseconds.
    Timestamp,
}

impl ValueType {
    /// Returns true for [`ValueType::String`].
    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::String)
    }

    /// Whether values of this type have a natural ordering.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, ValueType::Boolean | ValueType::Enum(_))
    }

    /// Type name for messages.
    pub fn describe(&self) -> String {
        match self {
            ValueType::String => "string".to_string(),
            ValueType::Boolean => "boolean".to_string(),
            ValueType::Integer => "integer".to_string(),
            ValueType::Long => "long".to_string(),
            ValueType::Double => "double".to_string(),
            ValueType::Enum(e) => format!("enum {}", e.name()),
            ValueType::Timestamp => "timestamp".to_string(),
        }
    }

    /// Coerces a scalar into this type.
    ///
    /// Values that already have the right shape pass through; strings are
    /// parsed into booleans, numbers, enums and timestamps; anything else
    /// fails with [`FilterError::TypeCoercion`].
    pub fn coerce(&self, value: Scalar, key: &str) -> FilterResult<Scalar> {
        let fail = |value: &Scalar| FilterError::type_coercion(key, value.to_string(), self.describe());
        match (self, value) {
            (_, Scalar::Null) => Ok(Scalar::Null),

            (ValueType::String, Scalar::Str(s)) => Ok(Scalar::Str(s)),
            (ValueType::String, Scalar::Enum(s)) => Ok(Scalar::Str(s)),
            (ValueType::String, other) => Ok(Scalar::Str(other.to_string())),

            (ValueType::Boolean, Scalar::Bool(b)) => Ok(Scalar::Bool(b)),
            (ValueType::Boolean, Scalar::Str(s)) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(Scalar::Bool(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(Scalar::Bool(false))
                } else {
                    Err(fail(&Scalar::Str(s)))
                }
            }

            (ValueType::Integer, Scalar::Int(i)) => i32::try_from(i)
                .map(|_| Scalar::Int(i))
                .map_err(|_| fail(&Scalar::Int(i))),
            (ValueType::Integer, Scalar::Str(s)) => s
                .trim()
                .parse::<i32>()
                .map(|i| Scalar::Int(i.into()))
                .map_err(|_| fail(&Scalar::Str(s))),

            (ValueType::Long, Scalar::Int(i)) => Ok(Scalar::Int(i)),
            (ValueType::Long, Scalar::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(Scalar::Int)
                .map_err(|_| fail(&Scalar::Str(s))),

            (ValueType::Double, Scalar::Float(v)) => Ok(Scalar::Float(v)),
            (ValueType::Double, Scalar::Int(i)) => Ok(Scalar::Float(i as f64)),
            (ValueType::Double, Scalar::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Scalar::Float)
                .map_err(|_| fail(&Scalar::Str(s))),

            (ValueType::Enum(enum_type), Scalar::Enum(name) | Scalar::Str(name)) => {
                match enum_type.resolve(&name) {
                    Some(canonical) => Ok(Scalar::Enum(canonical.to_string())),
                    None => {
                        tracing::info!(
                            value = %name,
                            enum_type = enum_type.name(),
                            "value cannot be transformed into the enum type"
                        );
                        Err(FilterError::TypeCoercion {
                            key: key.to_string(),
                            value: name,
                            expected: self.describe(),
                            allowed: enum_type
                                .variants()
                                .iter()
                                .map(|v| v.to_lowercase())
                                .collect(),
                        })
                    }
                }
            }

            (ValueType::Timestamp, Scalar::Timestamp(t)) => Ok(Scalar::Timestamp(t)),
            (ValueType::Timestamp, Scalar::Int(millis)) => DateTime::from_timestamp_millis(millis)
                .map(Scalar::Timestamp)
                .ok_or_else(|| fail(&Scalar::Int(millis))),
            (ValueType::Timestamp, Scalar::Str(s)) => {
                if let Ok(t) = DateTime::parse_from_rfc3339(s.trim()) {
                    return Ok(Scalar::Timestamp(t.with_timezone(&Utc)));
                }
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(DateTime::from_timestamp_millis)
                    .map(Scalar::Timestamp)
                    .ok_or_else(|| fail(&Scalar::Str(s)))
            }

            (_, other) => Err(fail(&other)),
        }
    }
}

/// Which characters change when case is ignored.
///
/// Matches what the database's `UPPER` does, so both backends fold the same
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseFolding {
    /// Only `a`-`z` and `A`-`Z`, like SQLite.
    Ascii,
    /// Full Unicode case mapping.
    #[default]
    Unicode,
}

impl CaseFolding {
    /// Upper-cases `s`.
    pub fn upper(self, s: &str) -> String {
        match self {
            CaseFolding::Ascii => s.to_ascii_uppercase(),
            CaseFolding::Unicode => s.to_uppercase(),
        }
    }

    /// Lower-cases `s`.
    pub fn lower(self, s: &str) -> String {
        match self {
            CaseFolding::Ascii => s.to_ascii_lowercase(),
            CaseFolding::Unicode => s.to_lowercase(),
        }
    }

    /// True if `a` and `b` are equal once upper-cased.
    pub fn equal(self, a: &str, b: &str) -> bool {
        match self {
            CaseFolding::Ascii => a.eq_ignore_ascii_case(b),
            CaseFolding::Unicode => a.to_uppercase() == b.to_uppercase(),
        }
    }
}

/// A typed runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Absent / null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (both [`ValueType::Integer`] and [`ValueType::Long`]).
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// Canonical enum variant name.
    Enum(String),
    /// UTC instant.
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Returns true for [`Scalar::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Returns the string if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Upper-cases strings with `folding`; other values are returned unchanged.
    pub fn fold_case(self, folding: CaseFolding) -> Scalar {
        match self {
            Scalar::Str(s) => Scalar::Str(folding.upper(&s)),
            other => other,
        }
    }

    /// Natural ordering between two values of the same kind.
    ///
    /// Returns `None` when either side is null or the kinds have no common
    /// ordering (booleans, enums, mixed kinds).
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(s) | Scalar::Enum(s) => write!(f, "{}", s),
            Scalar::Timestamp(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::Timestamp(value)
    }
}

/// Checks the operator against the declared type, coerces the comparison's
/// literal(s) into that type and validates their cardinality.
///
/// Shared by the matcher and the SQL compiler so both reject the same inputs:
/// - ordering operators need an ordered type (not boolean or enum),
/// - `like` / `not like` need a string field,
/// - `null` is only compared with `==` / `!=`,
/// - single-valued operators get exactly one value, `in` / `not in` at least one.
///
/// The returned vector is never empty.
pub fn operand_values(comparison: &Comparison, value_type: &ValueType) -> FilterResult<Vec<Scalar>> {
    let op = comparison.op();
    let key = comparison.path_context();

    if op.is_ordering() && !value_type.is_ordered() {
        return Err(FilterError::unsupported_operator(
            key,
            op,
            format!("{} fields have no ordering", value_type.describe()),
        ));
    }
    if op.is_pattern() && !value_type.is_string() {
        return Err(FilterError::unsupported_operator(
            key,
            op,
            format!("pattern matching needs a string field, found {}", value_type.describe()),
        ));
    }

    if comparison.value().is_null() && !matches!(op, Operator::Eq | Operator::Ne) {
        return Err(FilterError::unsupported_operator(
            key,
            op,
            "null can only be compared with == or !=",
        ));
    }

    let values = match comparison.value() {
        Literal::List(items) => items
            .iter()
            .map(|item| value_type.coerce(item.to_scalar(), key))
            .collect::<FilterResult<Vec<_>>>()?,
        single => vec![value_type.coerce(single.to_scalar(), key)?],
    };

    if values.is_empty() {
        return Err(FilterError::value_arity(key, op, "requires at least one value"));
    }
    if values.len() > 1 && !op.is_membership() {
        return Err(FilterError::value_arity(key, op, "expects exactly one value"));
    }
    Ok(values)
}
