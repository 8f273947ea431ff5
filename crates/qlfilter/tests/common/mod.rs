//! Shared device schema and dataset for integration tests.
//!
//! The same devices are available as JSON documents (for the matcher) and as
//! rows of an in-memory SQLite database (for compiled SQL).

#![allow(dead_code)]

use std::sync::Arc;

use chrono::DateTime;
use qlfilter_rs::filter::{EnumType, Scalar, ValueType};
use qlfilter_rs::schema::{CollectionStorage, EntityType, FieldSchema, QueryField};
use qlfilter_rs::sql::Rendered;
use serde_json::{json, Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ==================== Schema ====================

pub fn device_type() -> Arc<EntityType> {
    let tag = EntityType::builder("Tag", "tags")
        .basic("name", "name", ValueType::String)
        .basic("colour", "colour", ValueType::String)
        .build();
    let distribution_set = EntityType::builder("DistributionSet", "distribution_sets")
        .basic("name", "name", ValueType::String)
        .basic("version", "version", ValueType::String)
        .build();
    let address = EntityType::builder("Address", "devices")
        .basic("city", "city", ValueType::String)
        .basic("zip", "zip", ValueType::String)
        .build();
    let action = EntityType::builder("Action", "actions")
        .basic("status", "status", ValueType::String)
        .basic("weight", "weight", ValueType::Long)
        .build();
    let update_status = ValueType::Enum(EnumType::new(
        "UpdateStatus",
        ["REGISTERED", "PENDING", "IN_SYNC", "ERROR"],
    ));

    EntityType::builder("Device", "devices")
        .basic("controllerId", "controller_id", ValueType::String)
        .basic("name", "name", ValueType::String)
        .basic("description", "description", ValueType::String)
        .basic("updateStatus", "update_status", update_status)
        .basic("requestAttributes", "request_attributes", ValueType::Boolean)
        .basic("size", "size", ValueType::Long)
        .basic("rating", "rating", ValueType::Double)
        .basic("lastSeen", "last_seen", ValueType::Timestamp)
        .embedded("address", address)
        .reference("assignedDs", distribution_set, "assigned_ds_id")
        .entity_collection(
            "tags",
            tag,
            CollectionStorage::JoinTable {
                table: "device_tags".to_string(),
                owner_column: "device_id".to_string(),
                target_column: "tag_id".to_string(),
            },
        )
        .entity_collection(
            "actions",
            action,
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

pub fn device_fields() -> FieldSchema {
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
        .field(
            QueryField::new("tag", "tags")
                .sub_attributes(["name", "colour"])
                .default_sub_attribute("name"),
        )
        .field(QueryField::new("action", "actions").sub_attributes(["status", "weight"]))
        .field(QueryField::new("alias", "aliases"))
        .field(QueryField::new("attribute", "attributes").map())
}

// ==================== Dataset ====================

pub struct Tag {
    pub id: i64,
    pub name: &'static str,
    pub colour: Option<&'static str>,
}

pub struct DistributionSet {
    pub id: i64,
    pub name: &'static str,
    pub version: &'static str,
}

pub struct Action {
    pub status: &'static str,
    pub weight: i64,
}

pub struct Device {
    pub id: i64,
    pub controller_id: &'static str,
    pub name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub update_status: &'static str,
    pub request_attributes: Option<bool>,
    pub size: Option<i64>,
    pub rating: Option<f64>,
    pub last_seen: Option<&'static str>,
    pub city: Option<&'static str>,
    pub zip: Option<&'static str>,
    pub assigned_ds: Option<i64>,
    pub tags: Vec<i64>,
    pub actions: Vec<Action>,
    pub aliases: Vec<Option<&'static str>>,
    pub attributes: Vec<(&'static str, Option<&'static str>)>,
}

pub fn distribution_sets() -> Vec<DistributionSet> {
    vec![
        DistributionSet {
            id: 1,
            name: "firmware",
            version: "1.2",
        },
        DistributionSet {
            id: 2,
            name: "bootloader",
            version: "0.9",
        },
    ]
}

pub fn tags() -> Vec<Tag> {
    vec![
        Tag {
            id: 1,
            name: "y",
            colour: Some("red"),
        },
        Tag {
            id: 2,
            name: "z",
            colour: Some("blue"),
        },
        Tag {
            id: 3,
            name: "x",
            colour: None,
        },
        Tag {
            id: 4,
            name: "Alpha",
            colour: Some("green"),
        },
    ]
}

pub fn devices() -> Vec<Device> {
    vec![
        Device {
            id: 1,
            controller_id: "dev-1",
            name: Some("Sensor A"),
            description: None,
            update_status: "IN_SYNC",
            request_attributes: Some(true),
            size: Some(120),
            rating: Some(4.5),
            last_seen: Some("2024-03-01T10:00:00Z"),
            city: Some("Berlin"),
            zip: Some("10115"),
            assigned_ds: Some(1),
            tags: vec![1, 2],
            actions: vec![],
            aliases: vec![Some("alpha"), Some("beta")],
            attributes: vec![("hwRevision", Some("2")), ("vendor", Some("acme"))],
        },
        Device {
            id: 2,
            controller_id: "dev-2",
            name: Some("sensor b"),
            description: Some("spare 100%"),
            update_status: "PENDING",
            request_attributes: Some(false),
            size: Some(80),
            rating: Some(3.0),
            last_seen: Some("2023-12-24T08:30:00Z"),
            city: Some("Munich"),
            zip: None,
            assigned_ds: Some(2),
            tags: vec![3],
            actions: vec![
                Action {
                    status: "running",
                    weight: 5,
                },
                Action {
                    status: "error",
                    weight: 10,
                },
            ],
            aliases: vec![],
            attributes: vec![("hwRevision", Some("3"))],
        },
        Device {
            id: 3,
            controller_id: "dev-3",
            name: None,
            description: Some(""),
            update_status: "REGISTERED",
            request_attributes: None,
            size: None,
            rating: None,
            last_seen: None,
            city: None,
            zip: None,
            assigned_ds: None,
            tags: vec![],
            actions: vec![Action {
                status: "finished",
                weight: 1,
            }],
            aliases: vec![None],
            attributes: vec![],
        },
        Device {
            id: 4,
            controller_id: "dev_4",
            name: Some("Gateway*"),
            description: Some("a_b"),
            update_status: "ERROR",
            request_attributes: Some(true),
            size: Some(300),
            rating: Some(5.0),
            last_seen: Some("2025-01-01T00:00:00Z"),
            city: Some("Berlin"),
            zip: Some("10117"),
            assigned_ds: Some(1),
            tags: vec![4, 1],
            actions: vec![Action {
                status: "running",
                weight: 7,
            }],
            aliases: vec![Some("GW")],
            attributes: vec![("hwRevision", None), ("Vendor", Some("ACME"))],
        },
        Device {
            id: 5,
            controller_id: "DEV-5",
            name: Some("Sensor A"),
            description: Some("Sensor"),
            update_status: "IN_SYNC",
            request_attributes: Some(false),
            size: Some(120),
            rating: Some(2.25),
            last_seen: Some("2024-03-01T10:00:00Z"),
            city: Some("berlin"),
            zip: None,
            assigned_ds: Some(2),
            tags: vec![2],
            actions: vec![],
            aliases: vec![Some("alpha")],
            attributes: vec![("vendor", Some("other"))],
        },
        Device {
            id: 6,
            controller_id: "dev-6",
            name: Some("Éclair"),
            description: Some("Crème BRÛLÉE"),
            update_status: "PENDING",
            request_attributes: Some(true),
            size: Some(50),
            rating: Some(1.0),
            last_seen: Some("2023-06-01T00:00:00Z"),
            city: Some("Zürich"),
            zip: Some("8001"),
            assigned_ds: Some(1),
            tags: vec![1],
            actions: vec![Action {
                status: "running",
                weight: 2,
            }],
            aliases: vec![Some("gw")],
            attributes: vec![("Émetteur", Some("Wärme"))],
        },
    ]
}

pub fn all_ids() -> Vec<i64> {
    devices().iter().map(|d| d.id).collect()
}

// ==================== JSON documents ====================

impl Device {
    pub fn to_json(&self) -> Value {
        let sets = distribution_sets();
        let all_tags = tags();

        let assigned_ds = self
            .assigned_ds
            .and_then(|id| sets.iter().find(|s| s.id == id))
            .map(|s| json!({"id": s.id, "name": s.name, "version": s.version}))
            .unwrap_or(Value::Null);
        let tags: Vec<Value> = self
            .tags
            .iter()
            .filter_map(|id| all_tags.iter().find(|t| t.id == *id))
            .map(|t| json!({"id": t.id, "name": t.name, "colour": t.colour}))
            .collect();
        let actions: Vec<Value> = self
            .actions
            .iter()
            .map(|a| json!({"status": a.status, "weight": a.weight}))
            .collect();
        let attributes: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();

        json!({
            "id": self.id,
            "controllerId": self.controller_id,
            "name": self.name,
            "description": self.description,
            "updateStatus": self.update_status,
            "requestAttributes": self.request_attributes,
            "size": self.size,
            "rating": self.rating,
            "lastSeen": self.last_seen,
            "address": {"city": self.city, "zip": self.zip},
            "assignedDs": assigned_ds,
            "tags": tags,
            "actions": actions,
            "aliases": self.aliases,
            "attributes": attributes,
        })
    }
}

pub fn device_documents() -> Vec<Value> {
    devices().iter().map(Device::to_json).collect()
}

// ==================== SQLite ====================

const SCHEMA: &[&str] = &[
    "CREATE TABLE distribution_sets (id INTEGER PRIMARY KEY, name TEXT, version TEXT)",
    "CREATE TABLE devices (
        id INTEGER PRIMARY KEY,
        controller_id TEXT NOT NULL,
        name TEXT,
        description TEXT,
        update_status TEXT NOT NULL,
        request_attributes INTEGER,
        size INTEGER,
        rating REAL,
        last_seen INTEGER,
        city TEXT,
        zip TEXT,
        assigned_ds_id INTEGER REFERENCES distribution_sets(id)
    )",
    "CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT, colour TEXT)",
    "CREATE TABLE device_tags (device_id INTEGER NOT NULL, tag_id INTEGER NOT NULL)",
    "CREATE TABLE actions (id INTEGER PRIMARY KEY, device_id INTEGER NOT NULL, status TEXT, weight INTEGER)",
    "CREATE TABLE device_aliases (device_id INTEGER NOT NULL, alias TEXT)",
    "CREATE TABLE device_attributes (device_id INTEGER NOT NULL, attr_key TEXT NOT NULL, attr_value TEXT)",
];

fn millis(timestamp: &str) -> i64 {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => t.timestamp_millis(),
        Err(e) => panic!("bad fixture timestamp {timestamp}: {e}"),
    }
}

/// Routes library logs to the test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// In-memory database holding the dataset. LIKE is made case-sensitive so
/// patterns behave as in the matcher.
pub async fn sqlite_pool() -> SqlitePool {
    init_tracing();

    // one connection: every connection to :memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA case_sensitive_like = ON")
        .execute(&pool)
        .await
        .unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    for set in distribution_sets() {
        sqlx::query("INSERT INTO distribution_sets (id, name, version) VALUES (?, ?, ?)")
            .bind(set.id)
            .bind(set.name)
            .bind(set.version)
            .execute(&pool)
            .await
            .unwrap();
    }
    for tag in tags() {
        sqlx::query("INSERT INTO tags (id, name, colour) VALUES (?, ?, ?)")
            .bind(tag.id)
            .bind(tag.name)
            .bind(tag.colour)
            .execute(&pool)
            .await
            .unwrap();
    }

    for device in devices() {
        sqlx::query(
            "INSERT INTO devices (id, controller_id, name, description, update_status, \
             request_attributes, size, rating, last_seen, city, zip, assigned_ds_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(device.id)
        .bind(device.controller_id)
        .bind(device.name)
        .bind(device.description)
        .bind(device.update_status)
        .bind(device.request_attributes)
        .bind(device.size)
        .bind(device.rating)
        .bind(device.last_seen.map(millis))
        .bind(device.city)
        .bind(device.zip)
        .bind(device.assigned_ds)
        .execute(&pool)
        .await
        .unwrap();

        for tag_id in &device.tags {
            sqlx::query("INSERT INTO device_tags (device_id, tag_id) VALUES (?, ?)")
                .bind(device.id)
                .bind(*tag_id)
                .execute(&pool)
                .await
                .unwrap();
        }
        for action in &device.actions {
            sqlx::query("INSERT INTO actions (device_id, status, weight) VALUES (?, ?, ?)")
                .bind(device.id)
                .bind(action.status)
                .bind(action.weight)
                .execute(&pool)
                .await
                .unwrap();
        }
        for alias in &device.aliases {
            sqlx::query("INSERT INTO device_aliases (device_id, alias) VALUES (?, ?)")
                .bind(device.id)
                .bind(*alias)
                .execute(&pool)
                .await
                .unwrap();
        }
        for (key, value) in &device.attributes {
            sqlx::query("INSERT INTO device_attributes (device_id, attr_key, attr_value) VALUES (?, ?, ?)")
                .bind(device.id)
                .bind(*key)
                .bind(*value)
                .execute(&pool)
                .await
                .unwrap();
        }
    }

    pool
}

/// Runs a rendered query and returns the selected ids, sorted.
pub async fn select_ids(pool: &SqlitePool, rendered: &Rendered) -> Vec<i64> {
    let mut query = sqlx::query(&rendered.sql);
    for param in &rendered.params {
        query = match param {
            Scalar::Null => query.bind(None::<String>),
            Scalar::Bool(b) => query.bind(*b),
            Scalar::Int(i) => query.bind(*i),
            Scalar::Float(f) => query.bind(*f),
            Scalar::Str(s) | Scalar::Enum(s) => query.bind(s.clone()),
            Scalar::Timestamp(t) => query.bind(t.timestamp_millis()),
        };
    }

    let rows = match query.fetch_all(pool).await {
        Ok(rows) => rows,
        Err(e) => panic!("query failed: {e}\n{}", rendered.sql),
    };
    let mut ids: Vec<i64> = rows.iter().map(|row| row.get::<i64, _>(0)).collect();
    ids.sort_unstable();
    ids
}
