//! Filter expressions: syntax tree, query language and in-memory matching.
//!
//! # Supported Syntax
//!
//! ## Comparisons
//! - `key == value`, `key != value`
//! - `key > value`, `key >= value`, `key < value`, `key <= value`
//! - `key in (a, b)`, `key not in (a, b)`
//! - `key like "pat*"`, `key not like "pat*"` (`*` is any substring, `\*` a literal star)
//!
//! ## Values
//! - quoted strings (`"..."` or `'...'`), bare words, numbers
//! - `true`, `false`, `null`
//!
//! ## Boolean Operators
//! - `&&` / `and` - AND
//! - `||` / `or` - OR
//! - `()` - Grouping
//!
//! # Example
//!
//! ```
//! use qlfilter_rs::filter::{FilterMatcher, FilterParser};
//! use qlfilter_rs::schema::{EntityType, FieldSchema};
//! use qlfilter_rs::filter::ValueType;
//! use serde_json::json;
//!
//! let ticket = EntityType::builder("Ticket", "tickets")
//!     .basic("status", "status", ValueType::String)
//!     .build();
//! let fields = FieldSchema::derive(ticket.clone());
//!
//! let filter = FilterParser::parse(r#"status == "closed""#, &fields).unwrap();
//! let matcher = FilterMatcher::compile(&filter, &ticket, None).unwrap();
//!
//! let docs = vec![json!({"status": "closed"}), json!({"status": "open"})];
//! let matched = matcher.filter(&docs).unwrap();
//! assert_eq!(matched.len(), 1);
//! ```

mod ast;
mod error;
mod lexer;
mod matcher;
mod parser;
mod value;

pub use ast::{Comparison, FilterExpression, Logical, LogicalOp, Operator};
pub use error::{FilterError, FilterResult};
pub use lexer::{FilterToken, Lexer, LexerError, LexerResult, PositionedToken};
pub use matcher::FilterMatcher;
pub use parser::{has_unescaped_wildcard, FilterParser, QueryParser, ESCAPE_CHAR, LIKE_WILDCARD};
pub use value::{operand_values, CaseFolding, EnumType, Literal, Scalar, ValueType};


#[cfg(test)]
mod matcher_tests;
