//! The per-bucket object store.
//!
//! An unversioned bucket keeps one record per key. Enabling versioning
//! transitions the store to a version-stack per key (existing records
//! become the `null` version); suspending versioning keeps the history but
//! makes new writes overwrite the `null` version again.
//!
//! Keys are held in a `BTreeMap`, which gives listings their
//! lexicographic order for free.

use std::collections::BTreeMap;

use tracing::debug;

use super::object::{NULL_VERSION_ID, ObjectRecord};

/// Object storage for one bucket.
#[derive(Debug)]
pub enum ObjectStore {
    /// One record per key.
    Unversioned(BTreeMap<String, ObjectRecord>),
    /// A stack of versions per key, oldest first.
    Versioned(BTreeMap<String, Vec<ObjectRecord>>),
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::Unversioned(BTreeMap::new())
    }
}

impl ObjectStore {
    /// Whether the store has been transitioned to versioned.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        matches!(self, Self::Versioned(_))
    }

    /// Whether no current-version objects exist. Delete markers do not
    /// count: a fully deleted versioned bucket is empty even while its
    /// history remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unversioned(map) => map.is_empty(),
            Self::Versioned(map) => map
                .values()
                .all(|stack| stack.last().is_none_or(|r| r.delete_marker)),
        }
    }

    /// Convert to the versioned representation; existing records become
    /// their key's first version.
    pub fn transition_to_versioned(&mut self) {
        if let Self::Unversioned(map) = self {
            debug!("transitioning object store to versioned");
            let converted = std::mem::take(map)
                .into_iter()
                .map(|(key, record)| (key, vec![record]))
                .collect();
            *self = Self::Versioned(converted);
        }
    }

    /// Insert a record.
    ///
    /// In a versioned store a record with the `null` version replaces the
    /// existing `null` version in place (suspended-versioning semantics);
    /// any other version ID is pushed as the new current version.
    pub fn put(&mut self, record: ObjectRecord) {
        match self {
            Self::Unversioned(map) => {
                map.insert(record.key.clone(), record);
            }
            Self::Versioned(map) => {
                let stack = map.entry(record.key.clone()).or_default();
                if record.version_id == NULL_VERSION_ID {
                    stack.retain(|r| r.version_id != NULL_VERSION_ID);
                }
                stack.push(record);
            }
        }
    }

    /// The current version of `key`, if it exists and is not a delete
    /// marker.
    #[must_use]
    pub fn current(&self, key: &str) -> Option<&ObjectRecord> {
        match self {
            Self::Unversioned(map) => map.get(key),
            Self::Versioned(map) => map
                .get(key)
                .and_then(|stack| stack.last())
                .filter(|record| !record.delete_marker),
        }
    }

    /// A specific version of `key`.
    #[must_use]
    pub fn version(&self, key: &str, version_id: &str) -> Option<&ObjectRecord> {
        match self {
            Self::Unversioned(map) => map
                .get(key)
                .filter(|record| record.version_id == version_id),
            Self::Versioned(map) => map
                .get(key)
                .and_then(|stack| stack.iter().rev().find(|r| r.version_id == version_id)),
        }
    }

    /// Remove one specific version. Returns the removed record.
    pub fn remove_version(&mut self, key: &str, version_id: &str) -> Option<ObjectRecord> {
        match self {
            Self::Unversioned(map) => {
                if map.get(key).is_some_and(|r| r.version_id == version_id) {
                    map.remove(key)
                } else {
                    None
                }
            }
            Self::Versioned(map) => {
                let stack = map.get_mut(key)?;
                let idx = stack.iter().position(|r| r.version_id == version_id)?;
                let removed = stack.remove(idx);
                if stack.is_empty() {
                    map.remove(key);
                }
                Some(removed)
            }
        }
    }

    /// Remove the current record of `key` outright (unversioned delete).
    pub fn remove_current(&mut self, key: &str) -> Option<ObjectRecord> {
        match self {
            Self::Unversioned(map) => map.remove(key),
            Self::Versioned(map) => {
                let stack = map.get_mut(key)?;
                let removed = stack.pop();
                if stack.is_empty() {
                    map.remove(key);
                }
                removed
            }
        }
    }

    /// Current (non-marker) records in key order.
    #[must_use]
    pub fn current_records(&self) -> Vec<&ObjectRecord> {
        match self {
            Self::Unversioned(map) => map.values().collect(),
            Self::Versioned(map) => map
                .values()
                .filter_map(|stack| stack.last())
                .filter(|record| !record.delete_marker)
                .collect(),
        }
    }

    /// Every version of every key, in key order then oldest-to-newest.
    #[must_use]
    pub fn all_versions(&self) -> Vec<&ObjectRecord> {
        match self {
            Self::Unversioned(map) => map.values().collect(),
            Self::Versioned(map) => map.values().flat_map(|stack| stack.iter()).collect(),
        }
    }

    /// Mutable access to the current record of `key`.
    pub fn current_mut(&mut self, key: &str) -> Option<&mut ObjectRecord> {
        match self {
            Self::Unversioned(map) => map.get_mut(key),
            Self::Versioned(map) => map
                .get_mut(key)
                .and_then(|stack| stack.last_mut())
                .filter(|record| !record.delete_marker),
        }
    }
}
