//! Join creation and reuse while compiling one query.
//!
//! Every multi-valued attribute owns a list of join slots. A [`PathState`]
//! holds one cursor per attribute: each comparison on the attribute takes
//! the slot under the cursor (creating it when missing) and advances it, so
//! two comparisons on the same collection inside one AND get separate joins
//! and may be satisfied by different elements.
//!
//! OR branches are alternatives over the same rows. The compiler resets the
//! cursors to the state before the OR for each branch, which lets sibling
//! branches share slots, and continues with the furthest state afterwards.
//!
//! To-one references and map entries are lookups rather than scans; their
//! joins are cached by path (map entries by key) and always reused.

use std::collections::HashMap;

use super::predicate::{ColumnRef, Join, JoinKind, Predicate};
use crate::schema::{Attribute, AttributeKind, CollectionStorage, Element, EntityType};

/// Cursor positions into the join slots, one per multi-valued attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PathState {
    cursors: HashMap<String, usize>,
}

impl PathState {
    fn position(&self, slot: &str) -> usize {
        self.cursors.get(slot).copied().unwrap_or(0)
    }

    /// Keeps, per attribute, the further of the two cursors.
    pub(crate) fn furthest(mut self, other: &PathState) -> PathState {
        for (slot, &pos) in &other.cursors {
            let entry = self.cursors.entry(slot.clone()).or_insert(0);
            *entry = (*entry).max(pos);
        }
        self
    }
}

/// An element join of a collection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementJoin {
    /// Alias under which the element's own columns are read.
    pub(crate) alias: String,
    /// Non-null exactly when an element row was joined.
    pub(crate) guard: ColumnRef,
    /// The value column, for collections of plain values.
    pub(crate) value: Option<ColumnRef>,
}

/// Builds the joins of one (sub)query rooted at `root_alias`.
#[derive(Debug)]
pub(crate) struct PathResolver<'e> {
    entity: &'e EntityType,
    root_alias: String,
    collection_join: JoinKind,
    joins: Vec<Join>,
    slots: HashMap<String, Vec<ElementJoin>>,
    lookups: HashMap<String, String>,
    state: PathState,
    next_alias: usize,
}

impl<'e> PathResolver<'e> {
    /// `collection_join` is the join used for collection elements: LEFT in
    /// the main query, INNER in a negation subquery.
    pub(crate) fn new(entity: &'e EntityType, root_alias: impl Into<String>, collection_join: JoinKind) -> Self {
        Self {
            entity,
            root_alias: root_alias.into(),
            collection_join,
            joins: Vec::new(),
            slots: HashMap::new(),
            lookups: HashMap::new(),
            state: PathState::default(),
            next_alias: 1,
        }
    }

    /// The root entity's id column.
    pub(crate) fn root_id(&self) -> ColumnRef {
        ColumnRef::new(self.root_alias.clone(), self.entity.id_column())
    }

    pub(crate) fn snapshot(&self) -> PathState {
        self.state.clone()
    }

    pub(crate) fn restore(&mut self, state: PathState) {
        self.state = state;
    }

    pub(crate) fn into_joins(self) -> Vec<Join> {
        self.joins
    }

    fn alias(&mut self) -> String {
        let alias = format!("{}_{}", self.root_alias, self.next_alias);
        self.next_alias += 1;
        alias
    }

    fn push_join(&mut self, kind: JoinKind, table: &str, on: impl FnOnce(&str) -> Predicate) -> String {
        let alias = self.alias();
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: alias.clone(),
            on: on(&alias),
        });
        alias
    }

    /// Walks single-valued hops starting at `alias` and returns the column
    /// of the final basic attribute.
    ///
    /// Embedded attributes stay on the same alias; references get a cached
    /// LEFT join so a missing target reads as null.
    pub(crate) fn column(&mut self, alias: &str, hops: &[&Attribute]) -> ColumnRef {
        let mut alias = alias.to_string();
        let mut cache_key = alias.clone();
        for hop in hops {
            match hop.kind() {
                AttributeKind::Basic { column, .. } => return ColumnRef::new(alias, column.as_str()),
                AttributeKind::Embedded { .. } => {
                    cache_key = format!("{}.{}", cache_key, hop.name());
                }
                AttributeKind::Reference { target, join_column } => {
                    cache_key = format!("{}.{}", cache_key, hop.name());
                    alias = match self.lookups.get(&cache_key) {
                        Some(existing) => existing.clone(),
                        None => {
                            let owner = ColumnRef::new(alias.clone(), join_column.as_str());
                            let created = self.push_join(JoinKind::Left, target.table(), |a| {
                                Predicate::eq(ColumnRef::new(a, target.id_column()), owner)
                            });
                            self.lookups.insert(cache_key.clone(), created.clone());
                            created
                        }
                    };
                }
                // resolve_path never yields multi-valued hops here
                AttributeKind::Collection { .. } | AttributeKind::Map { .. } => break,
            }
        }
        ColumnRef::new(alias, self.entity.id_column())
    }

    /// The LEFT join on the map table restricted to one key, shared by every
    /// comparison on that entry. `entry` identifies the key; `key_match`
    /// builds the key condition of the `ON` clause.
    pub(crate) fn map_entry(
        &mut self,
        attribute: &Attribute,
        entry: &str,
        key_match: impl FnOnce(ColumnRef) -> Predicate,
    ) -> Option<String> {
        let AttributeKind::Map {
            table,
            owner_column,
            key_column,
            ..
        } = attribute.kind()
        else {
            return None;
        };
        let cache_key = format!("{}.{}[{}]", self.root_alias, attribute.name(), entry);
        if let Some(existing) = self.lookups.get(&cache_key) {
            return Some(existing.clone());
        }

        let root_id = self.root_id();
        let alias = self.push_join(JoinKind::Left, table, |a| {
            Predicate::all(vec![
                Predicate::eq(ColumnRef::new(a, owner_column.as_str()), root_id),
                key_match(ColumnRef::new(a, key_column.as_str())),
            ])
        });
        self.lookups.insert(cache_key, alias.clone());
        Some(alias)
    }

    /// Takes the join slot under the cursor for `attribute`, creating the
    /// element join when no slot exists yet, and advances the cursor.
    pub(crate) fn element(&mut self, attribute: &Attribute) -> Option<ElementJoin> {
        let slot = attribute.name().to_string();
        let position = self.state.position(&slot);
        let existing = self.slots.get(&slot).and_then(|joins| joins.get(position)).cloned();

        let join = match existing {
            Some(join) => join,
            None => {
                let created = self.join_element(attribute)?;
                self.slots.entry(slot.clone()).or_default().push(created.clone());
                created
            }
        };
        self.state.cursors.insert(slot, position + 1);
        Some(join)
    }

    fn join_element(&mut self, attribute: &Attribute) -> Option<ElementJoin> {
        let AttributeKind::Collection { element, storage } = attribute.kind() else {
            return None;
        };
        let kind = self.collection_join;
        let root_id = self.root_id();

        let join = match (element, storage) {
            (
                Element::Entity(target),
                CollectionStorage::JoinTable {
                    table,
                    owner_column,
                    target_column,
                },
            ) => {
                let link = self.push_join(kind, table, |a| {
                    Predicate::eq(ColumnRef::new(a, owner_column.as_str()), root_id)
                });
                let target_ref = ColumnRef::new(link.as_str(), target_column.as_str());
                let alias = self.push_join(kind, target.table(), |a| {
                    Predicate::eq(ColumnRef::new(a, target.id_column()), target_ref)
                });
                ElementJoin {
                    guard: ColumnRef::new(alias.as_str(), target.id_column()),
                    alias,
                    value: None,
                }
            }
            (Element::Entity(target), CollectionStorage::ForeignKey { owner_column }) => {
                let alias = self.push_join(kind, target.table(), |a| {
                    Predicate::eq(ColumnRef::new(a, owner_column.as_str()), root_id)
                });
                ElementJoin {
                    guard: ColumnRef::new(alias.as_str(), target.id_column()),
                    alias,
                    value: None,
                }
            }
            (
                Element::Value(_),
                CollectionStorage::ElementTable {
                    table,
                    owner_column,
                    value_column,
                },
            ) => {
                let alias = self.push_join(kind, table, |a| {
                    Predicate::eq(ColumnRef::new(a, owner_column.as_str()), root_id)
                });
                ElementJoin {
                    guard: ColumnRef::new(alias.as_str(), owner_column.as_str()),
                    value: Some(ColumnRef::new(alias.as_str(), value_column.as_str())),
                    alias,
                }
            }
            _ => return None,
        };
        Some(join)
    }
}
