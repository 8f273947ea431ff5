//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```
//! use qlfilter_rs::prelude::*;
//!
//! let service = FilterService::new(FilterConfig::default());
//! let device = EntityType::builder("Device", "devices")
//!     .basic("name", "name", ValueType::String)
//!     .build();
//! let fields = FieldSchema::derive(device);
//! assert!(service.build_matcher("name == box", &fields).is_ok());
//! ```

// Configuration and service
pub use crate::config::FilterConfig;
pub use crate::service::{ExpressionTransformer, FilterService, KeyAliasTransformer};

// Expressions and errors
pub use crate::filter::{
    CaseFolding, Comparison, FilterError, FilterExpression, FilterMatcher, FilterParser, FilterResult, Literal,
    Operator, QueryParser, Scalar, ValueType,
};

// Schema
pub use crate::schema::{Entity, EntityType, FieldSchema, FieldValue, QueryField};

// SQL
pub use crate::sql::{Database, Rendered, Specification, SpecificationBuilder};
