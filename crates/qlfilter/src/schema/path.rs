//! Resolution of comparison keys into attribute paths.
//!
//! Both backends resolve keys here so they accept and reject the same paths.
//! A multi-valued attribute (map or collection) may only be the first
//! segment; everything below it must be single-valued.

use super::entity::{Attribute, AttributeKind, Element, EntityType};
use super::fields::SUB_ATTRIBUTE_SEPARATOR;
use crate::filter::{Comparison, FilterError, FilterResult, ValueType};

/// Where a comparison key points.
#[derive(Debug)]
pub(crate) enum AttributePath<'e> {
    /// Single-valued hops through embedded or referenced entities, ending in
    /// a basic attribute (the last element).
    Direct(Vec<&'e Attribute>),
    /// One entry of a map attribute.
    MapEntry {
        attribute: &'e Attribute,
        key: String,
        value_type: &'e ValueType,
    },
    /// Elements of a collection. `hops` walks from an element entity to a
    /// basic attribute and is empty for value collections.
    Collection {
        attribute: &'e Attribute,
        hops: Vec<&'e Attribute>,
        value_type: &'e ValueType,
    },
}

impl<'e> AttributePath<'e> {
    /// Declared type of the compared value.
    pub(crate) fn value_type(&self) -> &'e ValueType {
        match self {
            AttributePath::Direct(hops) => basic_type(hops),
            AttributePath::MapEntry { value_type, .. } | AttributePath::Collection { value_type, .. } => {
                value_type
            }
        }
    }
}

fn basic_type<'e>(hops: &[&'e Attribute]) -> &'e ValueType {
    match hops.last().map(|a| a.kind()) {
        Some(AttributeKind::Basic { value_type, .. }) => value_type,
        // resolve_chain always ends in a basic attribute
        _ => &ValueType::String,
    }
}

fn split(path: &str) -> (&str, Option<&str>) {
    match path.split_once(SUB_ATTRIBUTE_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Resolves `comparison`'s key against `entity`.
pub(crate) fn resolve_path<'e>(
    entity: &'e EntityType,
    comparison: &Comparison,
) -> FilterResult<AttributePath<'e>> {
    let context = comparison.path_context();
    let missing_sub_key = |what: &str| {
        FilterError::unsupported_operator(
            context,
            comparison.op(),
            format!("{} requires a sub-attribute", what),
        )
    };

    let (head, rest) = split(comparison.key());
    let attribute = entity.require(head)?;

    match attribute.kind() {
        AttributeKind::Basic { .. } => match rest {
            None => Ok(AttributePath::Direct(vec![attribute])),
            Some(_) => Err(FilterError::unsupported_field(
                context,
                format!("{} has no sub-attributes", attribute.name()),
            )),
        },
        AttributeKind::Map { value_type, .. } => match rest {
            Some(key) if !key.is_empty() => Ok(AttributePath::MapEntry {
                attribute,
                key: key.to_string(),
                value_type,
            }),
            _ => Err(missing_sub_key(&format!("map {}", attribute.name()))),
        },
        AttributeKind::Collection {
            element: Element::Value(value_type),
            ..
        } => match rest {
            None => Ok(AttributePath::Collection {
                attribute,
                hops: Vec::new(),
                value_type,
            }),
            Some(_) => Err(FilterError::unsupported_field(
                context,
                format!("elements of {} have no sub-attributes", attribute.name()),
            )),
        },
        AttributeKind::Collection {
            element: Element::Entity(target),
            ..
        } => {
            let rest = rest.ok_or_else(|| missing_sub_key(&format!("collection {}", attribute.name())))?;
            let hops = resolve_chain(target, rest, context)?;
            let value_type = basic_type(&hops);
            Ok(AttributePath::Collection {
                attribute,
                hops,
                value_type,
            })
        }
        AttributeKind::Embedded { target } | AttributeKind::Reference { target, .. } => {
            let rest = rest.ok_or_else(|| missing_sub_key(attribute.name()))?;
            let mut hops = vec![attribute];
            hops.extend(resolve_chain(target, rest, context)?);
            Ok(AttributePath::Direct(hops))
        }
    }
}

/// Resolves a single-valued chain ending in a basic attribute.
fn resolve_chain<'e>(entity: &'e EntityType, path: &str, context: &str) -> FilterResult<Vec<&'e Attribute>> {
    let mut hops = Vec::new();
    let mut current = entity;
    let mut remaining = Some(path);

    while let Some(path) = remaining {
        let (head, rest) = split(path);
        let attribute = current.require(head)?;
        hops.push(attribute);
        match (attribute.kind(), rest) {
            (AttributeKind::Basic { .. }, None) => return Ok(hops),
            (AttributeKind::Basic { .. }, Some(_)) => {
                return Err(FilterError::unsupported_field(
                    context,
                    format!("{} has no sub-attributes", attribute.name()),
                ))
            }
            (AttributeKind::Embedded { target } | AttributeKind::Reference { target, .. }, Some(rest)) => {
                current = target.as_ref();
                remaining = Some(rest);
            }
            (AttributeKind::Embedded { .. } | AttributeKind::Reference { .. }, None) => {
                remaining = None;
            }
            (AttributeKind::Map { .. } | AttributeKind::Collection { .. }, _) => {
                return Err(FilterError::unsupported_field(
                    context,
                    format!("nested multi-valued attribute {} is not supported", attribute.name()),
                ))
            }
        }
    }

    Err(FilterError::unsupported_field(
        context,
        "path must end in a plain attribute",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;
    use crate::schema::CollectionStorage;
    use std::sync::Arc;

    fn device() -> Arc<EntityType> {
        let ds = EntityType::builder("DistributionSet", "sets")
            .basic("name", "name", ValueType::String)
            .build();
        let tag = EntityType::builder("Tag", "tags")
            .basic("name", "name", ValueType::String)
            .build();
        EntityType::builder("Device", "devices")
            .basic("name", "name", ValueType::String)
            .reference("assignedDs", ds, "assigned_ds")
            .entity_collection(
                "tags",
                tag,
                CollectionStorage::JoinTable {
                    table: "device_tags".to_string(),
                    owner_column: "device_id".to_string(),
                    target_column: "tag_id".to_string(),
                },
            )
            .map("attributes", ValueType::String, "device_attributes", "device_id", "k", "v")
            .build()
    }

    fn resolve(key: &str) -> FilterResult<usize> {
        let device = device();
        let cmp = Comparison::new(key, Operator::Eq, "x").unwrap();
        resolve_path(&device, &cmp).map(|p| match p {
            AttributePath::Direct(hops) => hops.len(),
            AttributePath::MapEntry { .. } => 100,
            AttributePath::Collection { hops, .. } => 200 + hops.len(),
        })
    }

    #[test]
    fn test_direct_and_reference_paths() {
        assert_eq!(resolve("name").unwrap(), 1);
        assert_eq!(resolve("assignedDs.name").unwrap(), 2);
    }

    #[test]
    fn test_map_key_keeps_dots() {
        let device = device();
        let cmp = Comparison::new("attributes.a.b", Operator::Eq, "x").unwrap();
        match resolve_path(&device, &cmp).unwrap() {
            AttributePath::MapEntry { key, .. } => assert_eq!(key, "a.b"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_collection_path() {
        assert_eq!(resolve("tags.name").unwrap(), 201);
    }

    #[test]
    fn test_missing_sub_key_is_operator_error() {
        for key in ["attributes", "tags", "assignedDs"] {
            assert!(
                matches!(resolve(key), Err(FilterError::UnsupportedOperator { .. })),
                "{key}"
            );
        }
    }

    #[test]
    fn test_sub_attribute_on_plain_field() {
        assert!(matches!(resolve("name.x"), Err(FilterError::UnsupportedField { .. })));
    }

    #[test]
    fn test_unknown_nested_attribute() {
        assert!(matches!(resolve("assignedDs.nmae"), Err(FilterError::UnsupportedField { .. })));
    }
}
