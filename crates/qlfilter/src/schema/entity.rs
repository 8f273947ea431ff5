//! Typed entity model shared by the matcher and the SQL compiler.
//!
//! An [`EntityType`] lists the attributes of one kind of record together with
//! how each is stored: a plain column, columns embedded in the owner's table,
//! a to-one reference, a collection, or a key/value map. Attribute names are
//! indexed case-insensitively once, when the type is built.

use std::collections::HashMap;
use std::sync::Arc;

use super::find_similar_name;
use crate::filter::{FilterError, FilterResult, ValueType};

/// A declared record type.
#[derive(Debug, Clone)]
pub struct EntityType {
    name: String,
    table: String,
    id_column: String,
    id_type: ValueType,
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
}

/// A named attribute of an [`EntityType`].
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    /// The declared (canonical) attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the attribute is stored.
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }
}

/// Storage kind of an attribute.
#[derive(Debug, Clone)]
pub enum AttributeKind {
    /// A single column of the owner's table.
    Basic {
        /// Column name.
        column: String,
        /// Declared type.
        value_type: ValueType,
    },
    /// A value object whose columns live in the owner's table.
    Embedded {
        /// The embedded type; only its basic attributes are used.
        target: Arc<EntityType>,
    },
    /// A to-one reference through a foreign key column on the owner's table.
    Reference {
        /// The referenced type.
        target: Arc<EntityType>,
        /// Owner column holding the target's id.
        join_column: String,
    },
    /// A multi-valued attribute.
    Collection {
        /// What the collection holds.
        element: Element,
        /// How elements are linked to their owner.
        storage: CollectionStorage,
    },
    /// A string-keyed map stored as `(owner, key, value)` rows.
    Map {
        /// Declared type of the map values.
        value_type: ValueType,
        /// Table holding the entries.
        table: String,
        /// Column referencing the owner's id.
        owner_column: String,
        /// Column holding the entry key.
        key_column: String,
        /// Column holding the entry value.
        value_column: String,
    },
}

/// Element type of a collection.
#[derive(Debug, Clone)]
pub enum Element {
    /// Elements are entities with their own attributes.
    Entity(Arc<EntityType>),
    /// Elements are plain values.
    Value(ValueType),
}

/// How a collection's elements are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStorage {
    /// Many-to-many link table between owner and element entity.
    JoinTable {
        /// Link table name.
        table: String,
        /// Link column referencing the owner's id.
        owner_column: String,
        /// Link column referencing the element's id.
        target_column: String,
    },
    /// The element entity's table has a column referencing the owner.
    ForeignKey {
        /// Element column referencing the owner's id.
        owner_column: String,
    },
    /// Plain values stored one per row.
    ElementTable {
        /// Table name.
        table: String,
        /// Column referencing the owner's id.
        owner_column: String,
        /// Column holding the value.
        value_column: String,
    },
}

impl EntityType {
    /// Starts building an entity type stored in `table`.
    ///
    /// The id attribute defaults to column `id` of type long; override it
    /// with [`EntityTypeBuilder::id`].
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            table: table.into(),
            id_column: "id".to_string(),
            id_type: ValueType::Long,
            attributes: Vec::new(),
        }
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key column.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Primary key type.
    pub fn id_type(&self) -> &ValueType {
        &self.id_type
    }

    /// All attributes, in declaration order (the id first).
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| self.attributes.get(i))
    }

    /// Looks up an attribute, failing with an [`FilterError::UnsupportedField`]
    /// that suggests the closest attribute name.
    pub fn require(&self, name: &str) -> FilterResult<&Attribute> {
        self.attribute(name).ok_or_else(|| {
            let suggestion = find_similar_name(name, self.attributes.iter().map(|a| a.name.as_str()));
            FilterError::unsupported_field(name, format!("{} has no such attribute", self.name))
                .with_suggestion(suggestion)
        })
    }
}

/// Builder for [`EntityType`].
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    table: String,
    id_column: String,
    id_type: ValueType,
    attributes: Vec<Attribute>,
}

impl EntityTypeBuilder {
    /// Sets the primary key column and type.
    pub fn id(mut self, column: impl Into<String>, id_type: ValueType) -> Self {
        self.id_column = column.into();
        self.id_type = id_type;
        self
    }

    /// Adds an attribute of any kind.
    pub fn attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            kind,
        });
        self
    }

    /// Adds a single-column attribute.
    pub fn basic(self, name: impl Into<String>, column: impl Into<String>, value_type: ValueType) -> Self {
        self.attribute(
            name,
            AttributeKind::Basic {
                column: column.into(),
                value_type,
            },
        )
    }

    /// Adds an embedded value object.
    pub fn embedded(self, name: impl Into<String>, target: Arc<EntityType>) -> Self {
        self.attribute(name, AttributeKind::Embedded { target })
    }

    /// Adds a to-one reference.
    pub fn reference(
        self,
        name: impl Into<String>,
        target: Arc<EntityType>,
        join_column: impl Into<String>,
    ) -> Self {
        self.attribute(
            name,
            AttributeKind::Reference {
                target,
                join_column: join_column.into(),
            },
        )
    }

    /// Adds a collection of entities.
    pub fn entity_collection(
        self,
        name: impl Into<String>,
        target: Arc<EntityType>,
        storage: CollectionStorage,
    ) -> Self {
        self.attribute(
            name,
            AttributeKind::Collection {
                element: Element::Entity(target),
                storage,
            },
        )
    }

    /// Adds a collection of plain values stored one per row.
    pub fn value_collection(
        self,
        name: impl Into<String>,
        value_type: ValueType,
        table: impl Into<String>,
        owner_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        self.attribute(
            name,
            AttributeKind::Collection {
                element: Element::Value(value_type),
                storage: CollectionStorage::ElementTable {
                    table: table.into(),
                    owner_column: owner_column.into(),
                    value_column: value_column.into(),
                },
            },
        )
    }

    /// Adds a string-keyed map.
    pub fn map(
        self,
        name: impl Into<String>,
        value_type: ValueType,
        table: impl Into<String>,
        owner_column: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        self.attribute(
            name,
            AttributeKind::Map {
                value_type,
                table: table.into(),
                owner_column: owner_column.into(),
                key_column: key_column.into(),
                value_column: value_column.into(),
            },
        )
    }

    /// Finishes the type. The id is exposed as attribute `id` unless an
    /// attribute of that name was declared explicitly.
    pub fn build(self) -> Arc<EntityType> {
        let mut attributes = Vec::with_capacity(self.attributes.len() + 1);
        if !self.attributes.iter().any(|a| a.name.eq_ignore_ascii_case("id")) {
            attributes.push(Attribute {
                name: "id".to_string(),
                kind: AttributeKind::Basic {
                    column: self.id_column.clone(),
                    value_type: self.id_type.clone(),
                },
            });
        }
        attributes.extend(self.attributes);

        let mut index = HashMap::with_capacity(attributes.len());
        for (i, attribute) in attributes.iter().enumerate() {
            // First declaration wins on case-insensitive clashes.
            index.entry(attribute.name.to_lowercase()).or_insert(i);
        }

        Arc::new(EntityType {
            name: self.name,
            table: self.table,
            id_column: self.id_column,
            id_type: self.id_type,
            attributes,
            index,
        })
    }
}
