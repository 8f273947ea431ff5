//! Logical query fields and key resolution.
//!
//! A [`FieldSchema`] names the fields a query may use and maps each one to an
//! attribute path of its [`EntityType`]. Keys are written
//! `field[.sub-attribute[.more]]`:
//!
//! - field names match case-insensitively, by name or by alias,
//! - plain fields reject sub-attributes,
//! - map fields require one: everything after the first dot is the map key,
//! - complex fields require one of their declared sub-attributes, unless
//!   they have a default sub-attribute, which is used when none is given.

use std::sync::Arc;

use super::entity::{AttributeKind, Element, EntityType};
use super::find_similar_name;
use crate::filter::{FilterError, FilterResult};

/// Separator between a field and its sub-attribute.
pub const SUB_ATTRIBUTE_SEPARATOR: char = '.';

/// A field that may appear in queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    name: String,
    path: String,
    sub_attributes: Vec<String>,
    default_sub_attribute: Option<String>,
    map: bool,
    aliases: Vec<String>,
}

impl QueryField {
    /// A field called `name` reading the entity attribute path `path`.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            sub_attributes: Vec::new(),
            default_sub_attribute: None,
            map: false,
            aliases: Vec::new(),
        }
    }

    /// Declares the sub-attributes a complex field accepts.
    pub fn sub_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sub-attribute used when the key names only the field.
    pub fn default_sub_attribute(mut self, name: impl Into<String>) -> Self {
        self.default_sub_attribute = Some(name.into());
        self
    }

    /// Marks the field as a map: the rest of the key is the map key.
    pub fn map(mut self) -> Self {
        self.map = true;
        self
    }

    /// Adds a legacy name that resolves to this field.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity attribute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Legacy names.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether this is a map field.
    pub fn is_map(&self) -> bool {
        self.map
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// The sub-attribute used when none is given: the declared default, or
    /// the only sub-attribute if there is exactly one.
    fn effective_default(&self) -> Option<&str> {
        match (&self.default_sub_attribute, self.sub_attributes.as_slice()) {
            (Some(default), _) => Some(default),
            (None, [only]) => Some(only),
            _ => None,
        }
    }
}

/// The fields queries may use against one entity type.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    entity: Arc<EntityType>,
    fields: Vec<QueryField>,
}

impl FieldSchema {
    /// An empty schema for `entity`; add fields with [`FieldSchema::field`].
    pub fn new(entity: Arc<EntityType>) -> Self {
        Self {
            entity,
            fields: Vec::new(),
        }
    }

    /// Exposes every attribute of `entity` under its own name.
    ///
    /// Embedded, referenced and entity-collection attributes accept the
    /// basic attributes of their target as sub-attributes; maps are map
    /// fields.
    pub fn derive(entity: Arc<EntityType>) -> Self {
        let fields = entity
            .attributes()
            .iter()
            .map(|attribute| {
                let field = QueryField::new(attribute.name(), attribute.name());
                let target = match attribute.kind() {
                    AttributeKind::Basic { .. } => return field,
                    AttributeKind::Map { .. } => return field.map(),
                    AttributeKind::Collection {
                        element: Element::Value(_),
                        ..
                    } => return field,
                    AttributeKind::Embedded { target }
                    | AttributeKind::Reference { target, .. }
                    | AttributeKind::Collection {
                        element: Element::Entity(target),
                        ..
                    } => target,
                };
                let names: Vec<&str> = target
                    .attributes()
                    .iter()
                    .filter(|a| matches!(a.kind(), AttributeKind::Basic { .. }))
                    .map(|a| a.name())
                    .collect();
                field.sub_attributes(names)
            })
            .collect();
        Self { entity, fields }
    }

    /// Adds a field.
    pub fn field(mut self, field: QueryField) -> Self {
        self.fields.push(field);
        self
    }

    /// The entity type the fields refer to.
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// Declared fields.
    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    /// Finds a field by name or alias, ignoring case.
    pub fn find(&self, name: &str) -> Option<&QueryField> {
        self.fields.iter().find(|f| f.answers_to(name))
    }

    /// Resolves a query key to an entity attribute path.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnsupportedField`] when the field is unknown
    /// (with a "did you mean" suggestion), when a map field has no key, when
    /// a complex field lacks a required sub-attribute or names an unknown
    /// one, and when a plain field is given a sub-attribute.
    pub fn resolve_key(&self, key: &str) -> FilterResult<String> {
        let (name, rest) = match key.split_once(SUB_ATTRIBUTE_SEPARATOR) {
            Some((name, rest)) => (name, Some(rest)),
            None => (key, None),
        };
        tracing::debug!(key, field = name, "resolving query key");

        let field = self.find(name).ok_or_else(|| {
            let suggestion = find_similar_name(name, self.fields.iter().map(|f| f.name.as_str()));
            FilterError::unsupported_field(key, "unknown field").with_suggestion(suggestion)
        })?;

        match rest {
            None if field.sub_attributes.is_empty() && !field.map => Ok(field.path.clone()),
            None if field.map => Err(FilterError::unsupported_field(
                key,
                format!("no key specified for map field {}", field.name),
            )),
            None => match field.effective_default() {
                Some(default) => Ok(join(&field.path, default)),
                None => Err(FilterError::unsupported_field(
                    key,
                    format!(
                        "field {} requires one of the sub-attributes {}",
                        field.name,
                        field.sub_attributes.join(", ")
                    ),
                )),
            },
            Some(map_key) if field.map => Ok(join(&field.path, map_key)),
            Some(_) if field.sub_attributes.is_empty() => Err(FilterError::unsupported_field(
                key,
                format!("sub-attributes are not supported for field {}", field.name),
            )),
            Some(sub) => {
                let (first, tail) = match sub.split_once(SUB_ATTRIBUTE_SEPARATOR) {
                    Some((first, tail)) => (first, Some(tail)),
                    None => (sub, None),
                };
                let canonical = field
                    .sub_attributes
                    .iter()
                    .find(|a| a.eq_ignore_ascii_case(first))
                    .ok_or_else(|| {
                        let suggestion =
                            find_similar_name(first, field.sub_attributes.iter().map(String::as_str));
                        FilterError::unsupported_field(
                            key,
                            format!(
                                "unsupported sub-attribute, supported are {}",
                                field.sub_attributes.join(", ")
                            ),
                        )
                        .with_suggestion(suggestion)
                    })?;
                let path = join(&field.path, canonical);
                Ok(match tail {
                    Some(tail) => join(&path, tail),
                    None => path,
                })
            }
        }
    }
}

fn join(path: &str, sub: &str) -> String {
    format!("{}{}{}", path, SUB_ATTRIBUTE_SEPARATOR, sub)
}
