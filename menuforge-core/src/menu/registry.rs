//! Row key → entity resolution for one rendered view of the menu.
//!
//! A category attached to two labels is rendered twice, so a bare entity id
//! cannot identify a row. Every row therefore gets a key that combines the
//! key of the container it is rendered under with its own kind and id. Only
//! this module knows how that key is spelled; everything else asks the
//! registry.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::kind::EntityKind;
use super::tree::{FlatRow, MenuNode};

const SCOPE_SEPARATOR: char = '/';

/// Opaque identifier of one rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    /// Key for an entity rendered under `parent`, or at the root when
    /// `parent` is `None`.
    pub(crate) fn scoped(parent: Option<&RowKey>, kind: EntityKind, entity_id: i32) -> Self {
        match parent {
            Some(parent) => RowKey(format!(
                "{}{}{}:{}",
                parent.0, SCOPE_SEPARATOR, kind, entity_id
            )),
            None => RowKey(format!("{}:{}", kind, entity_id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys round-trip through the view layer as plain strings (checkbox ids,
/// drag payloads). Whatever comes back is only ever looked up, never parsed.
impl From<String> for RowKey {
    fn from(value: String) -> Self {
        RowKey(value)
    }
}

impl From<&str> for RowKey {
    fn from(value: &str) -> Self {
        RowKey(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub kind: EntityKind,
    pub entity_id: i32,
    /// Key of the container this row is rendered under in the current view.
    pub parent_key: Option<RowKey>,
}

/// Immutable snapshot mapping row keys to entities. Rebuild it whenever the
/// visible rows change.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    entries: IndexMap<RowKey, RegistryEntry>,
}

impl IdentityRegistry {
    /// Build from the nested tree rendering.
    pub fn from_tree(nodes: &[MenuNode]) -> Self {
        let mut entries = IndexMap::new();
        for node in nodes {
            Self::collect_node(node, None, &mut entries);
        }
        Self { entries }
    }

    fn collect_node(
        node: &MenuNode,
        parent_key: Option<&RowKey>,
        entries: &mut IndexMap<RowKey, RegistryEntry>,
    ) {
        entries.insert(
            node.key.clone(),
            RegistryEntry {
                kind: node.kind,
                entity_id: node.entity_id,
                parent_key: parent_key.cloned(),
            },
        );
        for child in &node.children {
            Self::collect_node(child, Some(&node.key), entries);
        }
    }

    /// Build from the flattened table rendering.
    pub fn from_rows(rows: &[FlatRow]) -> Self {
        let entries = rows
            .iter()
            .map(|row| {
                (
                    row.key.clone(),
                    RegistryEntry {
                        kind: row.kind,
                        entity_id: row.entity_id,
                        parent_key: row.parent_key.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &RowKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn get_entity_id(&self, key: &RowKey) -> Option<i32> {
        self.get(key).map(|entry| entry.entity_id)
    }

    pub fn get_parent_key(&self, key: &RowKey) -> Option<&RowKey> {
        self.get(key).and_then(|entry| entry.parent_key.as_ref())
    }

    /// Entity id of the container `key` is rendered under.
    pub fn get_parent_entity_id(&self, key: &RowKey) -> Option<i32> {
        self.get_parent_key(key)
            .and_then(|parent| self.get_entity_id(parent))
    }

    /// Every row currently rendering the given entity, in view order.
    pub fn keys_for(&self, kind: EntityKind, entity_id: i32) -> Vec<&RowKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind && entry.entity_id == entity_id)
            .map(|(key, _)| key)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &RegistryEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
