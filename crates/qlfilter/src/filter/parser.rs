//! Recursive descent parser for filter expressions.

use super::ast::{Comparison, FilterExpression, Operator};
use super::error::{FilterError, FilterResult};
use super::lexer::{FilterToken, Lexer, PositionedToken};
use super::value::Literal;
use crate::schema::FieldSchema;

/// Wildcard character in `like` patterns.
pub const LIKE_WILDCARD: char = '*';

/// Escape character for a literal wildcard.
pub const ESCAPE_CHAR: char = '\\';

/// Turns query text into a [`FilterExpression`] whose keys are resolved
/// against a [`FieldSchema`].
///
/// Implemented for [`FilterParser::parse`] and for any closure of the same
/// shape, so callers can plug in another grammar.
pub trait QueryParser: Send + Sync {
    /// Parses `text`, resolving keys with `fields`.
    fn parse(&self, text: &str, fields: &FieldSchema) -> FilterResult<FilterExpression>;
}

impl<F> QueryParser for F
where
    F: Fn(&str, &FieldSchema) -> FilterResult<FilterExpression> + Send + Sync,
{
    fn parse(&self, text: &str, fields: &FieldSchema) -> FilterResult<FilterExpression> {
        self(text, fields)
    }
}

/// Parser for the filter query language.
///
/// # Grammar
///
/// ```text
/// expression ::= or_expr
/// or_expr    ::= and_expr (("||" | "or") and_expr)*
/// and_expr   ::= primary (("&&" | "and") primary)*
/// primary    ::= "(" expression ")" | comparison
/// comparison ::= key operator value
/// operator   ::= "==" | "!=" | ">" | ">=" | "<" | "<="
///              | "in" | "not" "in" | "like" | "not" "like"
/// value      ::= literal | "(" literal ("," literal)* ")"
/// literal    ::= string | word | number | "true" | "false" | "null"
/// ```
///
/// # Operator Precedence (highest to lowest)
///
/// 1. comparison
/// 2. AND, left-associative
/// 3. OR, left-associative
///
/// # Compatibility rewrites
///
/// - `==` / `!=` with an unescaped `*` in a string value become `like` / `not like`.
/// - `key == ""` means "null or empty": `key == null or key == ""`.
/// - `key != ""` means "set and not empty": `key like "*" and key != ""`.
///
/// # Example
///
/// ```
/// use qlfilter_rs::filter::{FilterParser, Operator};
///
/// let filter = FilterParser::parse_unresolved(r#"name == "dev*" and size >= 3"#).unwrap();
/// let comparisons = filter.comparisons();
/// assert_eq!(comparisons[0].op(), Operator::Like);
/// assert_eq!(comparisons[1].op(), Operator::Gte);
/// ```
pub struct FilterParser<'s> {
    tokens: Vec<PositionedToken>,
    position: usize,
    end: usize,
    fields: Option<&'s FieldSchema>,
}

impl<'s> FilterParser<'s> {
    /// Parses a query, resolving every key against `fields`.
    ///
    /// Comparisons carry the key as typed in their context, and the resolved
    /// attribute path as their key.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Syntax`] for malformed input and
    /// [`FilterError::UnsupportedField`] for keys that do not resolve.
    pub fn parse(input: &str, fields: &FieldSchema) -> FilterResult<FilterExpression> {
        FilterParser::run(input, Some(fields))
    }

    /// Parses a query, keeping keys as written.
    pub fn parse_unresolved(input: &str) -> FilterResult<FilterExpression> {
        FilterParser::run(input, None)
    }

    fn run(input: &str, fields: Option<&FieldSchema>) -> FilterResult<FilterExpression> {
        if input.trim().is_empty() {
            return Err(FilterError::syntax("empty expression", 0));
        }

        let result = Lexer::new(input).tokenize_with_errors();
        if let Some(error) = result.errors.first() {
            return Err(FilterError::syntax(error.message.clone(), error.position));
        }

        let mut parser = FilterParser {
            tokens: result.tokens,
            position: 0,
            end: input.len(),
            fields,
        };
        let filter = parser.parse_expression()?;

        // Check that we consumed all tokens
        if let Some(remaining) = parser.peek_positioned() {
            return Err(FilterError::syntax(
                format!("unexpected {}", remaining.token.describe()),
                remaining.position,
            ));
        }

        tracing::debug!(query = input, parsed = %filter, "parsed filter");
        Ok(filter)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&FilterToken> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn peek_positioned(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Checks if the current token matches the expected token type.
    fn check(&self, expected: &FilterToken) -> bool {
        self.peek() == Some(expected)
    }

    /// Position of the current token, or the end of input.
    fn current_position(&self) -> usize {
        self.peek_positioned().map_or(self.end, |t| t.position)
    }

    fn expect(&mut self, expected: FilterToken) -> FilterResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected.describe())))
        }
    }

    fn unexpected(&self, what: &str) -> FilterError {
        match self.peek_positioned() {
            Some(t) => FilterError::syntax(
                format!("{}, found {}", what, t.token.describe()),
                t.position,
            ),
            None => FilterError::syntax(format!("{}, found end of input", what), self.end),
        }
    }

    /// Parses the top-level expression (OR expression).
    fn parse_expression(&mut self) -> FilterResult<FilterExpression> {
        self.parse_or_expr()
    }

    /// Parses OR expressions: `and_expr (or and_expr)*`
    fn parse_or_expr(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.parse_and_expr()?;

        while self.check(&FilterToken::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = left.or(right);
        }

        Ok(left)
    }

    /// Parses AND expressions: `primary (and primary)*`
    fn parse_and_expr(&mut self) -> FilterResult<FilterExpression> {
        let mut left = self.parse_primary()?;

        while self.check(&FilterToken::And) {
            self.advance();
            let right = self.parse_primary()?;
            left = left.and(right);
        }

        Ok(left)
    }

    /// Parses primary expressions: `"(" expression ")" | comparison`
    fn parse_primary(&mut self) -> FilterResult<FilterExpression> {
        if self.check(&FilterToken::OpenParen) {
            self.advance();
            let inner = self.parse_expression()?;
            self.expect(FilterToken::CloseParen)?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FilterResult<FilterExpression> {
        let key_position = self.current_position();
        let selector = match self.peek() {
            Some(FilterToken::Word(word)) => word.clone(),
            _ => return Err(self.unexpected("expected a field name")),
        };
        self.advance();

        let op = self.parse_operator()?;
        let value = self.parse_value(op)?;

        // unresolved keys are the selector itself, so they get no context
        let (key, context) = match self.fields {
            Some(fields) => {
                let key = fields.resolve_key(&selector).map_err(|e| {
                    tracing::debug!(selector = %selector, position = key_position, error = %e, "key did not resolve");
                    e
                })?;
                (key, Some(selector.as_str()))
            }
            None => (selector.clone(), None),
        };

        build_comparison(&key, op, value, context)
    }

    fn parse_operator(&mut self) -> FilterResult<Operator> {
        let op = match self.peek() {
            Some(FilterToken::Eq) => Operator::Eq,
            Some(FilterToken::Ne) => Operator::Ne,
            Some(FilterToken::Gt) => Operator::Gt,
            Some(FilterToken::Gte) => Operator::Gte,
            Some(FilterToken::Lt) => Operator::Lt,
            Some(FilterToken::Lte) => Operator::Lte,
            Some(FilterToken::In) => Operator::In,
            Some(FilterToken::Like) => Operator::Like,
            Some(FilterToken::Not) => {
                self.advance();
                return match self.peek() {
                    Some(FilterToken::In) => {
                        self.advance();
                        Ok(Operator::NotIn)
                    }
                    Some(FilterToken::Like) => {
                        self.advance();
                        Ok(Operator::NotLike)
                    }
                    _ => Err(self.unexpected("expected 'in' or 'like' after 'not'")),
                };
            }
            _ => return Err(self.unexpected("expected an operator")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_value(&mut self, op: Operator) -> FilterResult<Literal> {
        if op.is_membership() && self.check(&FilterToken::OpenParen) {
            self.advance();
            let mut items = vec![self.parse_literal()?];
            while self.check(&FilterToken::Comma) {
                self.advance();
                items.push(self.parse_literal()?);
            }
            self.expect(FilterToken::CloseParen)?;
            return Ok(Literal::List(items));
        }
        self.parse_literal()
    }

    fn parse_literal(&mut self) -> FilterResult<Literal> {
        let literal = match self.peek() {
            Some(FilterToken::Str(s)) | Some(FilterToken::Word(s)) => Literal::Str(s.clone()),
            Some(FilterToken::Int(i)) => Literal::Int(*i),
            Some(FilterToken::Float(v)) => Literal::Float(*v),
            Some(FilterToken::Bool(b)) => Literal::Bool(*b),
            Some(FilterToken::Null) => Literal::Null,
            _ => return Err(self.unexpected("expected a value")),
        };
        self.advance();
        Ok(literal)
    }
}

/// Builds the comparison for `key op value`, applying the compatibility
/// rewrites for wildcards and empty strings.
fn build_comparison(
    key: &str,
    op: Operator,
    value: Literal,
    context: Option<&str>,
) -> FilterResult<FilterExpression> {
    let leaf = |op: Operator, value: Literal| -> FilterResult<FilterExpression> {
        let comparison = Comparison::new(key, op, value)?;
        Ok(match context {
            Some(selector) => comparison.with_context(selector),
            None => comparison,
        }
        .into())
    };

    // the wildcard rewrite happens in Comparison::new
    let empty = value.as_str() == Some("");

    match op {
        Operator::Eq if empty => Ok(leaf(Operator::Eq, Literal::Null)?.or(leaf(Operator::Eq, value)?)),
        Operator::Ne if empty => {
            Ok(leaf(Operator::Like, Literal::from("*"))?.and(leaf(Operator::Ne, value)?))
        }
        _ => leaf(op, value),
    }
}

/// Returns true if `value` contains a `*` not preceded by the escape character.
pub fn has_unescaped_wildcard(value: &str) -> bool {
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR {
            chars.next();
        } else if c == LIKE_WILDCARD {
            return true;
        }
    }
    false
}
