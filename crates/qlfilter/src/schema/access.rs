//! Read access to in-memory objects for the matcher.

use std::collections::{BTreeMap, HashMap};

use crate::filter::Scalar;

/// A value read from an object field.
#[derive(Debug, Clone)]
pub enum FieldValue<'a> {
    /// The field is absent or null.
    Null,
    /// A plain value.
    Scalar(Scalar),
    /// A nested object: an embedded value, a referenced entity or a map.
    Entity(&'a dyn Entity),
    /// A multi-valued field; elements are scalars or entities.
    Collection(Vec<FieldValue<'a>>),
}

impl<'a> FieldValue<'a> {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<Scalar> for FieldValue<'_> {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Null => FieldValue::Null,
            other => FieldValue::Scalar(other),
        }
    }
}

impl<T: Into<Scalar>> From<Option<T>> for FieldValue<'_> {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, |v| FieldValue::from(v.into()))
    }
}

/// An object the matcher can read fields from.
///
/// `field` is called with the declared attribute name; implementations that
/// store differently-cased names should match case-insensitively. Map-valued
/// fields are returned as [`FieldValue::Entity`] whose [`Entity::keys`] lists
/// the map's keys.
pub trait Entity: std::fmt::Debug {
    /// Reads one field.
    fn field(&self, name: &str) -> FieldValue<'_>;

    /// Field names present on this object. Only needed for map-valued fields.
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<V> Entity for BTreeMap<String, V>
where
    V: Clone + Into<Scalar> + std::fmt::Debug,
{
    fn field(&self, name: &str) -> FieldValue<'_> {
        self.get(name)
            .map_or(FieldValue::Null, |v| FieldValue::from(v.clone().into()))
    }

    fn keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<V> Entity for HashMap<String, V>
where
    V: Clone + Into<Scalar> + std::fmt::Debug,
{
    fn field(&self, name: &str) -> FieldValue<'_> {
        self.get(name)
            .map_or(FieldValue::Null, |v| FieldValue::from(v.clone().into()))
    }

    fn keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}
