//! Filter service: the entry point that wires configuration, parsing and
//! both backends together.
//!
//! ```
//! use qlfilter_rs::config::FilterConfig;
//! use qlfilter_rs::filter::ValueType;
//! use qlfilter_rs::schema::{EntityType, FieldSchema};
//! use qlfilter_rs::service::FilterService;
//! use serde_json::json;
//!
//! let ticket = EntityType::builder("Ticket", "tickets")
//!     .basic("status", "status", ValueType::String)
//!     .build();
//! let fields = FieldSchema::derive(ticket.clone());
//! let service = FilterService::new(FilterConfig::default());
//!
//! let matcher = service.build_matcher("status == Closed", &fields).unwrap();
//! assert!(matcher.matches(&json!({"status": "closed"})).unwrap());
//!
//! let sql = service.to_sql("status == Closed", &fields).unwrap();
//! assert!(sql.sql.contains("UPPER"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::FilterConfig;
use crate::filter::{FilterExpression, FilterMatcher, FilterParser, FilterResult, QueryParser};
use crate::schema::{EntityType, FieldSchema};
use crate::sql::{Rendered, Specification, SpecificationBuilder};

/// Rewrites a parsed expression before it is compiled.
pub trait ExpressionTransformer: Send + Sync {
    /// Returns the rewritten expression.
    fn transform(&self, expression: FilterExpression) -> FilterResult<FilterExpression>;
}

/// Renames comparison keys, e.g. to keep legacy attribute paths working.
///
/// Keys are matched case-insensitively against the whole resolved key.
#[derive(Debug, Clone, Default)]
pub struct KeyAliasTransformer {
    aliases: HashMap<String, String>,
}

impl KeyAliasTransformer {
    /// Creates an empty transformer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `from` to `to`.
    pub fn alias(mut self, from: impl AsRef<str>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.as_ref().to_lowercase(), to.into());
        self
    }
}

impl ExpressionTransformer for KeyAliasTransformer {
    fn transform(&self, expression: FilterExpression) -> FilterResult<FilterExpression> {
        let rewritten = expression.map(|comparison| {
            self.aliases
                .get(&comparison.key().to_lowercase())
                .map(|key| comparison.with_key(key.as_str()))
        });
        Ok(rewritten.into_owned())
    }
}

/// Builds matchers and SQL specifications from query text.
pub struct FilterService {
    config: FilterConfig,
    parser: Arc<dyn QueryParser>,
    transformers: Vec<Arc<dyn ExpressionTransformer>>,
}

impl fmt::Debug for FilterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterService")
            .field("config", &self.config)
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

impl FilterService {
    /// Creates a service using the built-in query grammar.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            parser: Arc::new(|text: &str, fields: &FieldSchema| FilterParser::parse(text, fields)),
            transformers: Vec::new(),
        }
    }

    /// Replaces the query grammar.
    pub fn with_parser(mut self, parser: Arc<dyn QueryParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Appends a transformer; transformers run in the order added.
    pub fn with_transformer(mut self, transformer: impl ExpressionTransformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// The configuration the service was built with.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Parses `text` and runs the transformers.
    ///
    /// When the configuration compares without case, the text is lower-cased
    /// first.
    pub fn parse(&self, text: &str, fields: &FieldSchema) -> FilterResult<FilterExpression> {
        let text = match self.config.case_folding() {
            Some(folding) => folding.lower(text),
            None => text.to_string(),
        };
        let mut expression = self.parser.parse(&text, fields)?;
        for transformer in &self.transformers {
            expression = transformer.transform(expression)?;
        }
        tracing::debug!(filter = %expression, "parsed filter");
        Ok(expression)
    }

    /// Parses `text` into a SQL specification.
    pub fn build_predicate(&self, text: &str, fields: &FieldSchema) -> FilterResult<Specification> {
        let expression = self.parse(text, fields)?;
        Ok(SpecificationBuilder::new(self.config.fold_case_in_sql()).specification(expression))
    }

    /// Parses `text` into a matcher for the schema's entity type.
    pub fn build_matcher(&self, text: &str, fields: &FieldSchema) -> FilterResult<FilterMatcher> {
        let expression = self.parse(text, fields)?;
        FilterMatcher::compile(&expression, fields.entity(), self.config.case_folding())
    }

    /// Parses `text` and compiles it against `entity` without running
    /// anything, surfacing syntax and semantic errors.
    pub fn validate(&self, text: &str, fields: &FieldSchema, entity: &EntityType) -> FilterResult<()> {
        self.build_predicate(text, fields)?.to_query(entity).map(|_| ())
    }

    /// Parses and renders `text` for the configured database.
    pub fn to_sql(&self, text: &str, fields: &FieldSchema) -> FilterResult<Rendered> {
        self.build_predicate(text, fields)?
            .to_sql(fields.entity(), self.config.database)
    }
}
