//! WAL-backed implementation of [`AliasStore`].
//!
//! Reads are served from an in-memory index. Writes go to the WAL first and
//! only then touch the index, all under the index write lock, so the log order
//! always matches the order the index saw.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use crate::alias::{AliasEntry, AliasSnapshot};
use crate::storage::traits::{AliasStore, StorageError};

use super::file_lock::DirLock;
use super::snapshot;
use super::wal::{WalOp, WriteAheadLog};
use super::PersistentConfig;

const WAL_FILE: &str = "aliases.wal";
const SNAPSHOT_FILE: &str = "aliases.snap";

type Index = BTreeMap<String, AliasEntry>;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

fn wal_err(e: std::io::Error) -> StorageError {
    StorageError::Backend(format!("WAL write failed: {e}"))
}

fn apply(index: &mut Index, op: WalOp) {
    match op {
        WalOp::Set { key, entry } => {
            index.insert(key, entry);
        }
        WalOp::Delete { key } => {
            index.remove(&key);
        }
        WalOp::Checkpoint { .. } => {}
    }
}

/// Result of a compaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionResult {
    /// Aliases written to the snapshot.
    pub entries_compacted: u64,
    /// Snapshot file, if one was written.
    pub snapshot_path: Option<PathBuf>,
    /// WAL size in bytes before compacting.
    pub wal_size_before: u64,
    /// WAL size in bytes afterwards.
    pub wal_size_after: u64,
}

/// Durable alias store rooted at one directory.
///
/// Holds the directory lock until dropped.
pub struct PersistentAliasStore {
    dir: PathBuf,
    _lock: DirLock,
    wal: WriteAheadLog,
    snapshot_path: PathBuf,
    index: RwLock<Index>,
    config: PersistentConfig,
}

impl std::fmt::Debug for PersistentAliasStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentAliasStore")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistentAliasStore {
    /// Open or create a store. Prefer [`super::open_store`], which also
    /// validates the config.
    ///
    /// # Errors
    /// - `StorageError::Locked` if another handle holds the directory
    /// - `StorageError::Open` if the snapshot or WAL cannot be read
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| {
            StorageError::Open(format!("failed to create {}: {e}", dir.display()))
        })?;

        let lock = DirLock::acquire(dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut index = match snapshot::load(&snapshot_path)
            .map_err(|e| StorageError::Open(format!("failed to load snapshot: {e}")))?
        {
            Some((header, entries)) => {
                debug!(
                    entries = header.entry_count,
                    created_at = %header.created_at,
                    "loaded alias snapshot"
                );
                entries
            }
            None => Index::new(),
        };

        let wal = WriteAheadLog::open(&dir.join(WAL_FILE), config.sync_on_write)
            .map_err(|e| StorageError::Open(format!("failed to open WAL: {e}")))?;

        let mut replayed = 0usize;
        for record in wal
            .iter()
            .map_err(|e| StorageError::Open(format!("failed to iterate WAL: {e}")))?
        {
            let record =
                record.map_err(|e| StorageError::Open(format!("corrupted WAL entry: {e}")))?;
            apply(&mut index, record.op);
            replayed += 1;
        }

        info!(
            dir = %dir.display(),
            aliases = index.len(),
            replayed,
            "opened alias store"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            wal,
            snapshot_path,
            index: RwLock::new(index),
            config,
        })
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current WAL size in bytes.
    pub fn wal_size(&self) -> u64 {
        self.wal.size_bytes().unwrap_or(0)
    }

    /// Fold the WAL into a fresh snapshot and truncate it.
    ///
    /// Safe to interrupt at any point: until the WAL is truncated it still
    /// holds every mutation and will be replayed on the next open.
    ///
    /// # Errors
    /// `StorageError::Backend` if the snapshot cannot be written or the WAL
    /// cannot be truncated.
    pub fn compact(&self) -> Result<CompactionResult, StorageError> {
        let index = self.index.write().map_err(|_| lock_err("alias.compact"))?;
        self.compact_locked(&index)
    }

    fn compact_locked(&self, index: &Index) -> Result<CompactionResult, StorageError> {
        let wal_size_before = self.wal.size_bytes().unwrap_or(0);
        let up_to_sequence = self.wal.current_sequence();
        if up_to_sequence == 0 {
            return Ok(CompactionResult {
                entries_compacted: 0,
                snapshot_path: None,
                wal_size_before,
                wal_size_after: wal_size_before,
            });
        }

        let header = snapshot::store(&self.snapshot_path, index)
            .map_err(|e| StorageError::Backend(format!("failed to write snapshot: {e}")))?;

        self.wal
            .append(WalOp::Checkpoint { up_to_sequence })
            .map_err(wal_err)?;
        self.wal
            .truncate()
            .map_err(|e| StorageError::Backend(format!("failed to truncate WAL: {e}")))?;

        let wal_size_after = self.wal.size_bytes().unwrap_or(0);
        info!(
            entries = header.entry_count,
            wal_size_before, wal_size_after, "compacted alias store"
        );

        Ok(CompactionResult {
            entries_compacted: header.entry_count,
            snapshot_path: Some(self.snapshot_path.clone()),
            wal_size_before,
            wal_size_after,
        })
    }

    /// Compact if the WAL has outgrown the configured limit.
    ///
    /// The triggering write is already durable, so a failed compaction is
    /// reported in the log rather than to the writer.
    fn maybe_compact(&self, index: &Index) {
        if self.wal.size_bytes().unwrap_or(0) <= self.config.max_wal_size {
            return;
        }
        if let Err(e) = self.compact_locked(index) {
            warn!(dir = %self.dir.display(), "automatic compaction failed: {e}");
        }
    }
}

impl AliasStore for PersistentAliasStore {
    fn put(&self, key: String, entry: AliasEntry) -> Result<(), StorageError> {
        let mut index = self.index.write().map_err(|_| lock_err("alias.put"))?;
        self.wal
            .append(WalOp::Set {
                key: key.clone(),
                entry: entry.clone(),
            })
            .map_err(wal_err)?;
        index.insert(key, entry);
        self.maybe_compact(&index);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut index = self.index.write().map_err(|_| lock_err("alias.remove"))?;
        if !index.contains_key(key) {
            return Ok(false);
        }
        self.wal
            .append(WalOp::Delete {
                key: key.to_string(),
            })
            .map_err(wal_err)?;
        index.remove(key);
        self.maybe_compact(&index);
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<AliasEntry>, StorageError> {
        Ok(self
            .index
            .read()
            .map_err(|_| lock_err("alias.get"))?
            .get(key)
            .cloned())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.index.read().map_err(|_| lock_err("alias.len"))?.len())
    }

    fn snapshot(&self) -> Result<AliasSnapshot, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("alias.snapshot"))?;
        Ok(AliasSnapshot::new(index.clone()))
    }
}
