//! In-memory evaluation of filter expressions.
//!
//! [`FilterMatcher::compile`] resolves every key against an [`EntityType`]
//! once and coerces the literals into the declared field types, so unknown
//! fields and bad values are reported before any object is looked at.
//! [`FilterMatcher::matches`] then walks objects through the [`Entity`] trait.
//!
//! # Semantics
//!
//! - Positive operators on a collection are existential: some element must
//!   satisfy the comparison. An empty or null collection matches nothing.
//! - Negative operators (`!=`, `not in`, `not like`) on a collection are
//!   universal: no element may satisfy the positive counterpart. An empty or
//!   null collection matches.
//! - Negative operators are null-safe: a null or absent value is "not equal".
//! - Ordering operators never match null.
//! - A map entry that does not exist never matches a non-null comparison,
//!   whatever the operator.

use regex::Regex;

use super::ast::{Comparison, FilterExpression, LogicalOp, Operator};
use super::error::{FilterError, FilterResult};
use super::parser::{ESCAPE_CHAR, LIKE_WILDCARD};
use super::value::{operand_values, CaseFolding, Scalar, ValueType};
use crate::schema::{resolve_path, Attribute, AttributePath, Entity, EntityType, FieldValue};

/// A compiled filter that tests in-memory objects.
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    All(Vec<Node>),
    Any(Vec<Node>),
    Test(Test),
}

/// How to reach the compared value from the root object.
#[derive(Debug, Clone)]
enum Access {
    Direct(Vec<String>),
    MapEntry { field: String, key: String },
    Collection { field: String, hops: Vec<String> },
}

#[derive(Debug, Clone)]
struct Test {
    context: String,
    op: Operator,
    access: Access,
    value_type: ValueType,
    operands: Vec<Scalar>,
    pattern: Option<Regex>,
    folding: Option<CaseFolding>,
}

impl FilterMatcher {
    /// Compiles `expression` for objects of type `entity`.
    ///
    /// With a `folding`, string values and map keys compare without regard
    /// to case, upper-casing the characters that `folding` covers. `None`
    /// compares exactly.
    ///
    /// # Errors
    ///
    /// Any key that does not resolve, operator that does not apply to the
    /// field, or literal that cannot be coerced fails here.
    pub fn compile(
        expression: &FilterExpression,
        entity: &EntityType,
        folding: Option<CaseFolding>,
    ) -> FilterResult<Self> {
        tracing::debug!(filter = %expression, entity = entity.name(), ?folding, "compiling matcher");
        Ok(Self {
            root: compile_node(expression, entity, folding)?,
        })
    }

    /// Tests one object.
    ///
    /// # Errors
    ///
    /// Fails when an object's value does not fit the declared field type,
    /// e.g. a string where an entity or an unparseable number is expected.
    pub fn matches(&self, entity: &dyn Entity) -> FilterResult<bool> {
        self.root.evaluate(entity)
    }

    /// Returns the objects that match, in order.
    pub fn filter<'b, E: Entity>(&self, items: &'b [E]) -> FilterResult<Vec<&'b E>> {
        let mut matched = Vec::new();
        for item in items {
            if self.matches(item)? {
                matched.push(item);
            }
        }
        Ok(matched)
    }
}

fn compile_node(
    expression: &FilterExpression,
    entity: &EntityType,
    folding: Option<CaseFolding>,
) -> FilterResult<Node> {
    match expression {
        FilterExpression::Comparison(c) => Test::compile(c, entity, folding).map(Node::Test),
        FilterExpression::Logical(logical) => {
            let children = logical
                .children()
                .iter()
                .map(|child| compile_node(child, entity, folding))
                .collect::<FilterResult<Vec<_>>>()?;
            Ok(match logical.op() {
                LogicalOp::And => Node::All(children),
                LogicalOp::Or => Node::Any(children),
            })
        }
    }
}

impl Node {
    fn evaluate(&self, entity: &dyn Entity) -> FilterResult<bool> {
        match self {
            Node::All(children) => {
                for child in children {
                    if !child.evaluate(entity)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Any(children) => {
                for child in children {
                    if child.evaluate(entity)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Test(test) => test.evaluate(entity),
        }
    }
}

fn names(hops: &[&Attribute]) -> Vec<String> {
    hops.iter().map(|a| a.name().to_string()).collect()
}

impl Test {
    fn compile(comparison: &Comparison, entity: &EntityType, folding: Option<CaseFolding>) -> FilterResult<Self> {
        let path = resolve_path(entity, comparison)?;
        let value_type = path.value_type().clone();
        let access = match path {
            AttributePath::Direct(hops) => Access::Direct(names(&hops)),
            AttributePath::MapEntry { attribute, key, .. } => Access::MapEntry {
                field: attribute.name().to_string(),
                key,
            },
            AttributePath::Collection { attribute, hops, .. } => Access::Collection {
                field: attribute.name().to_string(),
                hops: names(&hops),
            },
        };

        let mut operands = operand_values(comparison, &value_type)?;
        if let Some(folding) = folding.filter(|_| value_type.is_string()) {
            operands = operands.into_iter().map(|v| v.fold_case(folding)).collect();
        }

        let pattern = match (comparison.op().is_pattern(), operands.first()) {
            (true, Some(Scalar::Str(p))) => Some(like_regex(p).map_err(|e| {
                FilterError::unsupported_operator(comparison.path_context(), comparison.op(), e.to_string())
            })?),
            _ => None,
        };

        Ok(Self {
            context: comparison.path_context().to_string(),
            op: comparison.op(),
            access,
            value_type,
            operands,
            pattern,
            folding,
        })
    }

    fn evaluate(&self, entity: &dyn Entity) -> FilterResult<bool> {
        let hit = match &self.access {
            Access::Direct(hops) => {
                let value = self.read_path(entity, hops)?;
                Some(self.test(&value))
            }
            Access::MapEntry { field, key } => self.map_entry(entity.field(field), key)?,
            Access::Collection { field, hops } => Some(self.any_element(entity.field(field), hops)?),
        };

        Ok(match hit {
            // map key absent
            None => false,
            Some(hit) if self.op.is_negative() => !hit,
            Some(hit) => hit,
        })
    }

    /// Follows single-valued hops; a null mid-path yields null.
    fn read_path(&self, entity: &dyn Entity, hops: &[String]) -> FilterResult<Scalar> {
        let mut current = entity;
        for (i, hop) in hops.iter().enumerate() {
            let last = i + 1 == hops.len();
            match (current.field(hop), last) {
                (FieldValue::Null, _) => return Ok(Scalar::Null),
                (FieldValue::Scalar(s), true) => return self.coerce(s),
                (FieldValue::Entity(next), false) => current = next,
                (other, _) => return Err(self.shape_error(hop, &other)),
            }
        }
        Ok(Scalar::Null)
    }

    fn map_entry(&self, value: FieldValue<'_>, key: &str) -> FilterResult<Option<bool>> {
        let map = match value {
            FieldValue::Entity(map) => Some(map),
            FieldValue::Null => None,
            other => return Err(self.shape_error(key, &other)),
        };
        let found = map.and_then(|m| {
            m.keys()
                .into_iter()
                .find(|k| match self.folding {
                    Some(folding) => folding.equal(k, key),
                    None => k == key,
                })
                .map(|k| m.field(&k))
        });

        match found {
            Some(FieldValue::Null) => Ok(Some(self.test(&Scalar::Null))),
            Some(FieldValue::Scalar(s)) => Ok(Some(self.test(&self.coerce(s)?))),
            Some(other) => Err(self.shape_error(key, &other)),
            // An absent entry reads as null only for null comparisons.
            None if self.operands.iter().all(Scalar::is_null) => Ok(Some(self.test(&Scalar::Null))),
            None => Ok(None),
        }
    }

    /// True if some element satisfies the positive comparison.
    fn any_element(&self, value: FieldValue<'_>, hops: &[String]) -> FilterResult<bool> {
        let items = match value {
            FieldValue::Null => return Ok(false),
            FieldValue::Collection(items) => items,
            other => return Err(self.shape_error(&self.context, &other)),
        };
        for item in items {
            let element = match (item, hops.is_empty()) {
                (FieldValue::Null, _) => Scalar::Null,
                (FieldValue::Scalar(s), true) => self.coerce(s)?,
                (FieldValue::Entity(e), false) => self.read_path(e, hops)?,
                (other, _) => return Err(self.shape_error(&self.context, &other)),
            };
            if self.test(&element) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Coerces an object's value into the declared type, folding case if needed.
    fn coerce(&self, value: Scalar) -> FilterResult<Scalar> {
        let value = self.value_type.coerce(value, &self.context)?;
        Ok(match self.folding {
            Some(folding) if self.value_type.is_string() => value.fold_case(folding),
            _ => value,
        })
    }

    /// Applies the positive counterpart of the operator.
    fn test(&self, actual: &Scalar) -> bool {
        let Some(expected) = self.operands.first() else {
            return false;
        };
        match self.op.positive() {
            Operator::Eq if expected.is_null() => actual.is_null(),
            Operator::Eq => !actual.is_null() && actual == expected,
            Operator::In => !actual.is_null() && self.operands.contains(actual),
            Operator::Gt => actual.compare(expected).is_some_and(|o| o.is_gt()),
            Operator::Gte => actual.compare(expected).is_some_and(|o| o.is_ge()),
            Operator::Lt => actual.compare(expected).is_some_and(|o| o.is_lt()),
            Operator::Lte => actual.compare(expected).is_some_and(|o| o.is_le()),
            Operator::Like => match (actual.as_str(), &self.pattern) {
                (Some(s), Some(pattern)) => pattern.is_match(s),
                _ => false,
            },
            // positive() never returns a negative operator
            Operator::Ne | Operator::NotIn | Operator::NotLike => false,
        }
    }

    fn shape_error(&self, field: &str, found: &FieldValue<'_>) -> FilterError {
        let found = match found {
            FieldValue::Null => "null",
            FieldValue::Scalar(_) => "a plain value",
            FieldValue::Entity(_) => "an object",
            FieldValue::Collection(_) => "a collection",
        };
        FilterError::unsupported_field(
            self.context.as_str(),
            format!("'{}' holds {} where the schema declares otherwise", field, found),
        )
    }
}

/// Translates a `like` pattern into an anchored regex: `*` matches any
/// substring and `\*` a literal asterisk.
fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR && chars.peek() == Some(&LIKE_WILDCARD) {
            chars.next();
            re.push_str(&regex::escape("*"));
        } else if c == LIKE_WILDCARD {
            re.push_str(".*");
        } else {
            let mut buf = [0u8; 4];
            re.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    re.push('$');
    Regex::new(&re)
}
