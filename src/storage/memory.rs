//! In-memory storage backend.
//!
//! Thread-safe and non-durable. Intended for embedded usage, tests, and as a
//! reference implementation of [`AliasStore`].

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::alias::{AliasEntry, AliasSnapshot};
use crate::storage::traits::{AliasStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory alias store.
#[derive(Debug, Default)]
pub struct InMemoryAliasStore {
    entries: RwLock<BTreeMap<String, AliasEntry>>,
}

impl InMemoryAliasStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<AliasSnapshot> for InMemoryAliasStore {
    fn from(snapshot: AliasSnapshot) -> Self {
        Self {
            entries: RwLock::new(snapshot.into_inner()),
        }
    }
}

impl AliasStore for InMemoryAliasStore {
    fn put(&self, key: String, entry: AliasEntry) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(|_| lock_err("alias.put"))?
            .insert(key, entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .entries
            .write()
            .map_err(|_| lock_err("alias.remove"))?
            .remove(key)
            .is_some())
    }

    fn get(&self, key: &str) -> Result<Option<AliasEntry>, StorageError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| lock_err("alias.get"))?
            .get(key)
            .cloned())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.entries.read().map_err(|_| lock_err("alias.len"))?.len())
    }

    fn snapshot(&self) -> Result<AliasSnapshot, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("alias.snapshot"))?;
        Ok(AliasSnapshot::new(entries.clone()))
    }
}
