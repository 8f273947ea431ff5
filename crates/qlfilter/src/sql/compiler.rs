//! Relational compiler: filter expressions to SQL predicates.
//!
//! # Semantics
//!
//! The compiled query selects the same entities the in-memory matcher
//! accepts:
//!
//! - `!=`, `not in` and `not like` are null-safe (`col IS NULL OR ..`).
//! - Positive comparisons on a collection join one element (LEFT JOIN) and
//!   test it, so some element has to match.
//! - Negative comparisons on a collection become `NOT EXISTS` over the same
//!   entity with the element INNER JOINed and the positive comparison
//!   applied, so no element may match and empty collections pass.
//! - `like "*"` on a collection means "has a non-null value"; `not like "*"`
//!   is its exact complement.
//! - Map entries are LEFT JOINed with the key in the `ON` clause. A negative
//!   comparison needs the key to exist and no entry with that key to satisfy
//!   the positive comparison.
//!
//! When case folding is on, string comparisons wrap both sides in `UPPER`.

use super::predicate::{ColumnRef, CompareOp, JoinKind, Operand, Predicate, SelectQuery};
use super::render::{render, Rendered};
use super::resolver::{ElementJoin, PathResolver};
use super::Database;
use crate::filter::{
    operand_values, Comparison, FilterError, FilterExpression, FilterResult, LogicalOp, Operator, Scalar,
};
use crate::schema::{resolve_path, Attribute, AttributeKind, AttributePath, EntityType};

/// Alias of the root entity in compiled queries.
pub const ROOT_ALIAS: &str = "e0";

/// Creates [`Specification`]s with a fixed case policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecificationBuilder {
    fold_case: bool,
}

impl SpecificationBuilder {
    /// With `fold_case`, string comparisons are compiled upper-cased on both
    /// sides.
    pub fn new(fold_case: bool) -> Self {
        Self { fold_case }
    }

    /// Whether string comparisons are upper-cased.
    pub fn fold_case(&self) -> bool {
        self.fold_case
    }

    /// Wraps `expression` for compilation against an entity type.
    pub fn specification(&self, expression: FilterExpression) -> Specification {
        Specification {
            expression,
            fold_case: self.fold_case,
        }
    }
}

/// A filter ready to be compiled against an [`EntityType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    expression: FilterExpression,
    fold_case: bool,
}

impl Specification {
    /// The wrapped expression.
    pub fn expression(&self) -> &FilterExpression {
        &self.expression
    }

    /// Builds `SELECT DISTINCT e0.id FROM <table> e0 .. WHERE ..`.
    ///
    /// # Errors
    ///
    /// Unknown fields, operators that do not apply to a field, wrong value
    /// counts and uncoercible literals all fail here, before anything runs.
    pub fn to_query(&self, entity: &EntityType) -> FilterResult<SelectQuery> {
        let mut compilation = Compilation {
            entity,
            fold_case: self.fold_case,
            subqueries: 0,
        };
        let mut resolver = PathResolver::new(entity, ROOT_ALIAS, JoinKind::Left);
        let filter = compilation.node(&self.expression, &mut resolver)?;
        let id = resolver.root_id();
        let joins = resolver.into_joins();

        tracing::debug!(
            filter = %self.expression,
            entity = entity.name(),
            joins = joins.len(),
            subqueries = compilation.subqueries,
            "compiled specification"
        );

        Ok(SelectQuery {
            table: entity.table().to_string(),
            alias: ROOT_ALIAS.to_string(),
            columns: vec![id],
            joins,
            filter: Some(filter),
            distinct: true,
        })
    }

    /// Compiles and renders for `database`.
    pub fn to_sql(&self, entity: &EntityType, database: Database) -> FilterResult<Rendered> {
        let query = self.to_query(entity)?;
        Ok(render(&query, database.dialect()))
    }
}

struct Compilation<'e> {
    entity: &'e EntityType,
    fold_case: bool,
    subqueries: usize,
}

impl<'e> Compilation<'e> {
    fn node(&mut self, expression: &FilterExpression, resolver: &mut PathResolver<'e>) -> FilterResult<Predicate> {
        let logical = match expression {
            FilterExpression::Comparison(c) => return self.comparison(c, resolver),
            FilterExpression::Logical(logical) => logical,
        };

        match logical.op() {
            LogicalOp::And => {
                let parts = logical
                    .children()
                    .iter()
                    .map(|child| self.node(child, resolver))
                    .collect::<FilterResult<Vec<_>>>()?;
                Ok(Predicate::all(parts))
            }
            LogicalOp::Or => {
                // each branch starts from the same cursors
                let start = resolver.snapshot();
                let mut furthest = start.clone();
                let mut parts = Vec::with_capacity(logical.children().len());
                for child in logical.children() {
                    resolver.restore(start.clone());
                    parts.push(self.node(child, resolver)?);
                    furthest = furthest.furthest(&resolver.snapshot());
                }
                resolver.restore(furthest);
                Ok(Predicate::any(parts))
            }
        }
    }

    fn comparison(&mut self, comparison: &Comparison, resolver: &mut PathResolver<'e>) -> FilterResult<Predicate> {
        let path = resolve_path(self.entity, comparison)?;
        let value_type = path.value_type();
        let operands = operand_values(comparison, value_type)?;
        let fold = self.fold_case && value_type.is_string();

        match path {
            AttributePath::Direct(hops) => {
                let root = resolver.root_id().alias;
                let column = resolver.column(&root, &hops);
                Ok(compare(column, comparison.op(), &operands, fold))
            }
            AttributePath::MapEntry { attribute, key, .. } => {
                self.map_entry(comparison, attribute, &key, &operands, fold, resolver)
            }
            AttributePath::Collection { attribute, hops, .. } => {
                self.collection(comparison, attribute, &hops, &operands, fold, resolver)
            }
        }
    }

    fn subquery_alias(&mut self) -> String {
        self.subqueries += 1;
        format!("s{}", self.subqueries)
    }

    fn map_entry(
        &mut self,
        comparison: &Comparison,
        attribute: &Attribute,
        key: &str,
        operands: &[Scalar],
        fold: bool,
        resolver: &mut PathResolver<'e>,
    ) -> FilterResult<Predicate> {
        let AttributeKind::Map {
            table,
            owner_column,
            key_column,
            value_column,
            ..
        } = attribute.kind()
        else {
            return Err(not_storable(comparison, attribute));
        };
        let fold_key = self.fold_case;
        let alias = resolver
            .map_entry(attribute, key, |column| key_equals(column, key, fold_key))
            .ok_or_else(|| not_storable(comparison, attribute))?;
        let value = ColumnRef::new(alias.as_str(), value_column.as_str());

        let op = comparison.op();
        let null_test = operands.iter().all(Scalar::is_null);
        if null_test || !op.is_negative() {
            return Ok(compare(value, op, operands, fold));
        }

        let sub_alias = self.subquery_alias();
        let mut entries = SelectQuery::probe(table.as_str(), sub_alias.as_str());
        entries.filter = Some(Predicate::all(vec![
            Predicate::eq(
                ColumnRef::new(sub_alias.as_str(), owner_column.as_str()),
                resolver.root_id(),
            ),
            key_equals(ColumnRef::new(sub_alias.as_str(), key_column.as_str()), key, fold_key),
            compare(
                ColumnRef::new(sub_alias.as_str(), value_column.as_str()),
                op.positive(),
                operands,
                fold,
            ),
        ]));

        Ok(Predicate::all(vec![
            Predicate::IsNotNull(ColumnRef::new(alias.as_str(), key_column.as_str()).into()),
            Predicate::Exists(Box::new(entries)).negate(),
        ]))
    }

    fn collection(
        &mut self,
        comparison: &Comparison,
        attribute: &Attribute,
        hops: &[&Attribute],
        operands: &[Scalar],
        fold: bool,
        resolver: &mut PathResolver<'e>,
    ) -> FilterResult<Predicate> {
        let op = comparison.op();
        let any_value = op.is_pattern() && operands.first().and_then(Scalar::as_str) == Some("*");

        if !op.is_negative() {
            let element = resolver
                .element(attribute)
                .ok_or_else(|| not_storable(comparison, attribute))?;
            return Ok(element_test(resolver, &element, hops, op, operands, fold, any_value));
        }

        let sub_alias = self.subquery_alias();
        let mut elements = PathResolver::new(self.entity, sub_alias.as_str(), JoinKind::Inner);
        let element = elements
            .element(attribute)
            .ok_or_else(|| not_storable(comparison, attribute))?;
        let test = element_test(&mut elements, &element, hops, op.positive(), operands, fold, any_value);
        let correlate = Predicate::eq(elements.root_id(), resolver.root_id());

        let query = SelectQuery {
            table: self.entity.table().to_string(),
            alias: sub_alias,
            columns: Vec::new(),
            joins: elements.into_joins(),
            filter: Some(Predicate::all(vec![correlate, test])),
            distinct: false,
        };
        Ok(Predicate::Exists(Box::new(query)).negate())
    }
}

/// Tests one joined element with a positive operator.
fn element_test(
    resolver: &mut PathResolver<'_>,
    element: &ElementJoin,
    hops: &[&Attribute],
    op: Operator,
    operands: &[Scalar],
    fold: bool,
    any_value: bool,
) -> Predicate {
    let column = match &element.value {
        Some(value) => value.clone(),
        None => resolver.column(&element.alias, hops),
    };
    if any_value {
        return Predicate::IsNotNull(column.into());
    }
    if op == Operator::Eq && operands.iter().all(Scalar::is_null) {
        // a missing element is not a null element
        return Predicate::all(vec![
            Predicate::IsNotNull(element.guard.clone().into()),
            Predicate::IsNull(column.into()),
        ]);
    }
    compare(column, op, operands, fold)
}

fn key_equals(column: ColumnRef, key: &str, fold: bool) -> Predicate {
    Predicate::Compare {
        left: Operand::Column(column).folded(fold),
        op: CompareOp::Eq,
        right: Operand::Param(Scalar::from(key)).folded(fold),
    }
}

/// Compiles one operator against a column. `operands` comes from
/// [`operand_values`] and is never empty.
fn compare(column: ColumnRef, op: Operator, operands: &[Scalar], fold: bool) -> Predicate {
    let Some(first) = operands.first() else {
        return Predicate::Or(Vec::new());
    };
    let subject = || Operand::Column(column.clone()).folded(fold);
    let param = |value: &Scalar| Operand::Param(value.clone()).folded(fold);
    let ordered = |op: CompareOp| Predicate::Compare {
        left: subject(),
        op,
        right: param(first),
    };

    let positive = match op {
        Operator::Eq if first.is_null() => return Predicate::IsNull(column.into()),
        Operator::Ne if first.is_null() => return Predicate::IsNotNull(column.into()),
        Operator::Ne => {
            return Predicate::any(vec![
                Predicate::IsNull(column.clone().into()),
                ordered(CompareOp::Ne),
            ])
        }
        Operator::Eq => ordered(CompareOp::Eq),
        Operator::Gt => ordered(CompareOp::Gt),
        Operator::Gte => ordered(CompareOp::Gte),
        Operator::Lt => ordered(CompareOp::Lt),
        Operator::Lte => ordered(CompareOp::Lte),
        Operator::In | Operator::NotIn => Predicate::In {
            operand: subject(),
            values: operands.iter().map(param).collect(),
        },
        Operator::Like | Operator::NotLike => Predicate::Like {
            operand: subject(),
            pattern: first.to_string(),
            upper: fold,
        },
    };

    if op.is_negative() {
        Predicate::any(vec![Predicate::IsNull(column.into()), positive.negate()])
    } else {
        positive
    }
}

fn not_storable(comparison: &Comparison, attribute: &Attribute) -> FilterError {
    FilterError::unsupported_field(
        comparison.path_context(),
        format!("{} is not stored the way its kind requires", attribute.name()),
    )
}
