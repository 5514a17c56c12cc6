//! Abstract storage trait for the alias dictionary.
//!
//! Backends implement [`AliasStore`]; the resolver and the alias mutation
//! operations only ever talk to this trait. Keys handed to a backend are
//! already case-folded and validated.

use thiserror::Error;

use crate::alias::{AliasEntry, AliasSnapshot};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding or decoding a stored record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store could not be opened or recovered.
    #[error("Failed to open alias store: {0}")]
    Open(String),

    /// Another process holds the store.
    #[error("Alias store is locked: {0}")]
    Locked(String),
}

/// Storage trait for alias entries.
///
/// # Consistency
/// - `snapshot` returns one point-in-time view; writes that race it may or
///   may not be visible
/// - Implementations must be safe for concurrent readers
pub trait AliasStore: Send + Sync {
    /// Insert or overwrite the entry for `key`.
    ///
    /// # Errors
    /// If the backend cannot record the write.
    fn put(&self, key: String, entry: AliasEntry) -> Result<(), StorageError>;

    /// Remove `key`. Returns whether an entry was present.
    ///
    /// # Errors
    /// If the backend cannot record the removal.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Look up one key.
    ///
    /// # Errors
    /// If the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<AliasEntry>, StorageError>;

    /// Number of stored aliases.
    ///
    /// # Errors
    /// If the backend cannot be read.
    fn len(&self) -> Result<usize, StorageError>;

    /// Whether the store holds no aliases.
    ///
    /// # Errors
    /// As [`AliasStore::len`].
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Copy of the whole dictionary.
    ///
    /// # Errors
    /// If the backend cannot be read.
    fn snapshot(&self) -> Result<AliasSnapshot, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_alias_store_object_safe(_: &dyn AliasStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Locked("held elsewhere".to_string());
        assert!(err.to_string().contains("locked"));

        let err = StorageError::Backend("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
