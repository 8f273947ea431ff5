//! Error types for filter parsing, matching and compilation.

use thiserror::Error;

use super::ast::Operator;

/// A specialized Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while parsing, matching or compiling a filter.
///
/// Every variant carries the key of the offending comparison (its context
/// when one was recorded by the parser) so callers can build a user-facing
/// message without re-walking the expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The query text is malformed.
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// What went wrong.
        message: String,
        /// Byte offset in the query text.
        position: usize,
    },

    /// A key segment does not resolve to a declared field.
    #[error("unsupported field '{key}': {reason}{}", did_you_mean(.suggestion))]
    UnsupportedField {
        /// The key (or key segment) that could not be resolved.
        key: String,
        /// Why the field was rejected.
        reason: String,
        /// The closest known field name, if any is near enough.
        suggestion: Option<String>,
    },

    /// The operator cannot be applied to the field or value.
    #[error("operator '{op}' is not supported for '{key}': {reason}")]
    UnsupportedOperator {
        /// The comparison key.
        key: String,
        /// The rejected operator.
        op: Operator,
        /// Why the operator was rejected.
        reason: String,
    },

    /// Wrong number of values for the operator.
    #[error("operator '{op}' on '{key}' {expected}")]
    ValueArity {
        /// The comparison key.
        key: String,
        /// The operator.
        op: Operator,
        /// The expected cardinality, phrased for the message.
        expected: String,
    },

    /// A literal could not be converted into the field's declared type.
    #[error("value '{value}' of '{key}' is not a valid {expected}{}", one_of(.allowed))]
    TypeCoercion {
        /// The comparison key.
        key: String,
        /// The offending literal.
        value: String,
        /// The declared type name.
        expected: String,
        /// Legal values, for enum-typed fields.
        allowed: Vec<String>,
    },

    /// Configuration could not be loaded.
    #[error("invalid filter configuration: {0}")]
    Config(String),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(". Did you mean '{}'?", s),
        None => String::new(),
    }
}

fn one_of(allowed: &[String]) -> String {
    if allowed.is_empty() {
        String::new()
    } else {
        format!(", must be one of: {}", allowed.join(", "))
    }
}

impl FilterError {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        FilterError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Creates an unsupported field error without a suggestion.
    pub fn unsupported_field(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::UnsupportedField {
            key: key.into(),
            reason: reason.into(),
            suggestion: None,
        }
    }

    /// Creates an unsupported operator error.
    pub fn unsupported_operator(
        key: impl Into<String>,
        op: Operator,
        reason: impl Into<String>,
    ) -> Self {
        FilterError::UnsupportedOperator {
            key: key.into(),
            op,
            reason: reason.into(),
        }
    }

    /// Creates a value arity error.
    pub fn value_arity(key: impl Into<String>, op: Operator, expected: impl Into<String>) -> Self {
        FilterError::ValueArity {
            key: key.into(),
            op,
            expected: expected.into(),
        }
    }

    /// Creates a type coercion error.
    pub fn type_coercion(
        key: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        FilterError::TypeCoercion {
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
            allowed: Vec::new(),
        }
    }

    /// Attaches a "did you mean" suggestion to an unsupported field error.
    /// Other variants are returned unchanged.
    pub fn with_suggestion(self, name: Option<String>) -> Self {
        match self {
            FilterError::UnsupportedField { key, reason, .. } => FilterError::UnsupportedField {
                key,
                reason,
                suggestion: name,
            },
            other => other,
        }
    }
}
