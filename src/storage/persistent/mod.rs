//! Durable alias store.
//!
//! This module provides crash-safe storage with:
//! - Write-ahead logging of every `set`/`delete`
//! - An exclusive directory lock for single-process access
//! - CRC32 checksums on every record
//! - Snapshot compaction so the log stays short
//!
//! # Layout
//!
//! ```text
//! <dir>/
//! ├── .lock          advisory lock, held while the store is open
//! ├── aliases.snap   last compacted snapshot (atomic rename)
//! └── aliases.wal    mutations since that snapshot
//! ```

mod codec;
mod file_lock;
mod snapshot;
mod store;
mod wal;

pub use file_lock::DirLock;
pub use snapshot::SnapshotHeader;
pub use store::{CompactionResult, PersistentAliasStore};
pub use wal::{WalOp, WalRecord, WriteAheadLog};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::storage::traits::StorageError;

/// Configuration for the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    /// WAL size (bytes) past which a write triggers compaction.
    pub max_wal_size: u64,
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            max_wal_size: 64 * 1024 * 1024, // 64 MB
            sync_on_write: true,
        }
    }
}

impl PersistentConfig {
    const MIN_WAL_SIZE: u64 = 4 * 1024; // 4 KiB minimum to avoid compacting on every write

    /// Reject settings the store cannot run with.
    ///
    /// # Errors
    /// `StorageError::Open` if `max_wal_size` is below 4 KiB.
    pub fn validate(self) -> Result<Self, StorageError> {
        if self.max_wal_size < Self::MIN_WAL_SIZE {
            return Err(StorageError::Open(format!(
                "max_wal_size must be at least {} bytes (got {})",
                Self::MIN_WAL_SIZE,
                self.max_wal_size
            )));
        }
        Ok(self)
    }
}

/// Open or create a durable alias store in directory `path`.
///
/// # Errors
/// - `StorageError::Locked` if another process holds the directory
/// - `StorageError::Open` if the directory, snapshot or WAL cannot be read
///
/// # Example
/// ```rust,no_run
/// use country_norm::storage::open_store;
///
/// let store = open_store("./countries.db", None)?;
/// # Ok::<(), country_norm::storage::StorageError>(())
/// ```
pub fn open_store(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> Result<PersistentAliasStore, StorageError> {
    let config = config.unwrap_or_default().validate()?;
    PersistentAliasStore::open(path.as_ref(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_validate() {
        assert!(PersistentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_tiny_wal() {
        let cfg = PersistentConfig {
            max_wal_size: 100,
            ..PersistentConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_wal_size"));
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg: PersistentConfig = serde_json::from_str(r#"{"sync_on_write": false}"#).unwrap();
        assert!(!cfg.sync_on_write);
        assert_eq!(cfg.max_wal_size, PersistentConfig::default().max_wal_size);
    }
}
