//! Shared device schema for unit tests.

use std::sync::Arc;

use crate::filter::{EnumType, FilterExpression, FilterParser, ValueType};
use crate::schema::{CollectionStorage, EntityType, FieldSchema, QueryField};

pub(crate) fn update_status() -> ValueType {
    ValueType::Enum(EnumType::new(
        "UpdateStatus",
        ["REGISTERED", "PENDING", "IN_SYNC", "ERROR"],
    ))
}

pub(crate) fn tag_type() -> Arc<EntityType> {
    EntityType::builder("Tag", "tags")
        .basic("name", "name", ValueType::String)
        .basic("colour", "colour", ValueType::String)
        .build()
}

pub(crate) fn distribution_set_type() -> Arc<EntityType> {
    EntityType::builder("DistributionSet", "distribution_sets")
        .basic("name", "name", ValueType::String)
        .basic("version", "version", ValueType::String)
        .build()
}

pub(crate) fn address_type() -> Arc<EntityType> {
    EntityType::builder("Address", "devices")
        .basic("city", "city", ValueType::String)
        .basic("zip", "zip", ValueType::String)
        .build()
}

pub(crate) fn action_type() -> Arc<EntityType> {
    EntityType::builder("Action", "actions")
        .basic("status", "status", ValueType::String)
        .basic("weight", "weight", ValueType::Long)
        .build()
}

pub(crate) fn device_type() -> Arc<EntityType> {
    EntityType::builder("Device", "devices")
        .basic("controllerId", "controller_id", ValueType::String)
        .basic("name", "name", ValueType::String)
        .basic("description", "description", ValueType::String)
        .basic("updateStatus", "update_status", update_status())
        .basic("requestAttributes", "request_attributes", ValueType::Boolean)
        .basic("size", "size", ValueType::Long)
        .basic("rating", "rating", ValueType::Double)
        .basic("lastSeen", "last_seen", ValueType::Timestamp)
        .embedded("address", address_type())
        .reference("assignedDs", distribution_set_type(), "assigned_ds_id")
        .entity_collection(
            "tags",
            tag_type(),
            CollectionStorage::JoinTable {
                table: "device_tags".to_string(),
                owner_column: "device_id".to_string(),
                target_column: "tag_id".to_string(),
            },
        )
        .entity_collection(
            "actions",
            action_type(),
            CollectionStorage::ForeignKey {
                owner_column: "device_id".to_string(),
            },
        )
        .value_collection("aliases", ValueType::String, "device_aliases", "device_id", "alias")
        .map(
            "attributes",
            ValueType::String,
            "device_attributes",
            "device_id",
            "attr_key",
            "attr_value",
        )
        .build()
}

/// Query fields named the way an API would expose them.
pub(crate) fn device_fields() -> FieldSchema {
    FieldSchema::new(device_type())
        .field(QueryField::new("id", "id"))
        .field(QueryField::new("controllerId", "controllerId"))
        .field(QueryField::new("name", "name"))
        .field(QueryField::new("description", "description"))
        .field(QueryField::new("updateStatus", "updateStatus").alias("status"))
        .field(QueryField::new("requestAttributes", "requestAttributes"))
        .field(QueryField::new("size", "size"))
        .field(QueryField::new("rating", "rating"))
        .field(QueryField::new("lastSeen", "lastSeen"))
        .field(QueryField::new("address", "address").sub_attributes(["city", "zip"]))
        .field(QueryField::new("assignedDs", "assignedDs").sub_attributes(["name", "version"]))
        .field(QueryField::new("tag", "tags").sub_attributes(["name", "colour"]).default_sub_attribute("name"))
        .field(QueryField::new("action", "actions").sub_attributes(["status", "weight"]))
        .field(QueryField::new("alias", "aliases"))
        .field(QueryField::new("attribute", "attributes").map())
}

pub(crate) fn parse(query: &str) -> FilterExpression {
    match FilterParser::parse(query, &device_fields()) {
        Ok(expression) => expression,
        Err(e) => panic!("failed to parse {query}: {e}"),
    }
}
