//! Versioned schema of the content database.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Schema version this build of Bookshelf declares.
pub const DB_VERSION: u32 = 2;

pub const STORIES: &str = "stories";
pub const IMAGES: &str = "images";
pub const CONTENT_HASH_INDEX: &str = "content_hash";

/// One structural change applied during an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    CreateCollection(&'static str),
    /// Index records of `collection` by the top-level field `key_path`.
    CreateIndex {
        collection: &'static str,
        name: &'static str,
        key_path: &'static str,
    },
    DeleteIndex {
        collection: &'static str,
        name: &'static str,
    },
}

/// Changes that bring a database up to `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStep {
    pub version: u32,
    pub changes: Vec<SchemaChange>,
}

/// Upgrade history of the `bookshelf` database.
pub fn bookshelf_schema() -> Vec<SchemaStep> {
    vec![
        SchemaStep {
            version: 1,
            changes: vec![
                SchemaChange::CreateCollection(STORIES),
                SchemaChange::CreateCollection(IMAGES),
            ],
        },
        SchemaStep {
            version: 2,
            changes: vec![SchemaChange::CreateIndex {
                collection: STORIES,
                name: CONTENT_HASH_INDEX,
                key_path: "content_hash",
            }],
        },
    ]
}

/// What is on disk: the version, collections and indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaState {
    pub version: u32,
    pub collections: BTreeSet<String>,
    /// collection -> index name -> key path
    #[serde(default)]
    pub indexes: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaState {
    pub fn has_collection(&self, collection: &str) -> bool {
        self.collections.contains(collection)
    }

    pub fn has_index(&self, collection: &str, index: &str) -> bool {
        self.indexes
            .get(collection)
            .is_some_and(|indexes| indexes.contains_key(index))
    }

    /// Indexes of `collection` as `(name, key_path)` pairs.
    pub fn indexes_of(&self, collection: &str) -> Vec<(String, String)> {
        self.indexes
            .get(collection)
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|(name, key_path)| (name.clone(), key_path.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Steps that move a database from `stored` to `requested`, in order.
pub fn pending_steps(steps: &[SchemaStep], stored: u32, requested: u32) -> Vec<&SchemaStep> {
    let mut pending: Vec<&SchemaStep> = steps
        .iter()
        .filter(|step| step.version > stored && step.version <= requested)
        .collect();
    pending.sort_by_key(|step| step.version);
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_steps_cover_the_gap_only() {
        let steps = bookshelf_schema();
        let versions: Vec<u32> = pending_steps(&steps, 0, 2).iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2]);

        let versions: Vec<u32> = pending_steps(&steps, 1, 2).iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![2]);

        assert!(pending_steps(&steps, 2, 2).is_empty());
    }
}
