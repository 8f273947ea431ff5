//! Matching against `serde_json` documents.
//!
//! Objects are entities, arrays are collections and JSON scalars map to
//! [`Scalar`]s. Field names are looked up exactly first and then ignoring
//! case.

use serde_json::Value;

use super::access::{Entity, FieldValue};
use crate::filter::Scalar;

fn to_field_value(value: &Value) -> FieldValue<'_> {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Scalar(Scalar::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Scalar(Scalar::Int(i)),
            None => n
                .as_f64()
                .map_or(FieldValue::Null, |f| FieldValue::Scalar(Scalar::Float(f))),
        },
        Value::String(s) => FieldValue::Scalar(Scalar::Str(s.clone())),
        Value::Array(items) => FieldValue::Collection(items.iter().map(to_field_value).collect()),
        Value::Object(_) => FieldValue::Entity(value),
    }
}

impl Entity for Value {
    fn field(&self, name: &str) -> FieldValue<'_> {
        let Value::Object(map) = self else {
            return FieldValue::Null;
        };
        let found = map.get(name).or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        });
        found.map_or(FieldValue::Null, to_field_value)
    }

    fn keys(&self) -> Vec<String> {
        match self {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}
