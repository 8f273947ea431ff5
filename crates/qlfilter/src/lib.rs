//! Filter expressions matched in memory or compiled to SQL
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use qlfilter_rs::prelude::*;
//! ```
//!
//! A query such as `status == closed and tag in (urgent, blocked)` is parsed
//! into a [`FilterExpression`](filter::FilterExpression) against a
//! [`FieldSchema`](schema::FieldSchema). The same expression can then be
//! evaluated against objects with a [`FilterMatcher`](filter::FilterMatcher)
//! or compiled into a SQL query with a
//! [`Specification`](sql::Specification); both select the same entities.
//! [`FilterService`](service::FilterService) wires parsing and both backends
//! to a [`FilterConfig`](config::FilterConfig).

pub mod config;
pub mod filter;
pub mod prelude;
pub mod schema;
pub mod service;
pub mod sql;

#[cfg(test)]
mod fixtures;
