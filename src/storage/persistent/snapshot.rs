//! Compacted snapshot of the alias dictionary.
//!
//! The snapshot is a single immutable file replaced atomically on each
//! compaction: written to a temporary sibling, fsynced, then renamed over the
//! old one. The WAL holds only what happened since.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [codec frame: SnapshotHeader]
//! [codec frame: BTreeMap<String, AliasEntry>]
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alias::AliasEntry;

use super::codec;

/// Metadata written ahead of the entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// When the snapshot was written.
    pub created_at: DateTime<Utc>,
    /// Number of aliases that follow the header.
    pub entry_count: u64,
}

/// Load the snapshot at `path`, or `None` if there is none yet.
///
/// # Errors
/// Any I/O or decoding failure, including a header from another version.
pub fn load(path: &Path) -> IoResult<Option<(SnapshotHeader, BTreeMap<String, AliasEntry>)>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);

    codec::read_header(&mut reader)?;
    let header: SnapshotHeader = codec::decode(&mut reader)?;
    let entries: BTreeMap<String, AliasEntry> = codec::decode(&mut reader)?;

    if entries.len() as u64 != header.entry_count {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            format!(
                "snapshot header claims {} entries, found {}",
                header.entry_count,
                entries.len()
            ),
        ));
    }

    Ok(Some((header, entries)))
}

/// Atomically replace the snapshot at `path` with `entries`.
///
/// # Errors
/// Any I/O failure while writing, syncing or renaming; the previous
/// snapshot stays in place.
pub fn store(path: &Path, entries: &BTreeMap<String, AliasEntry>) -> IoResult<SnapshotHeader> {
    let tmp = path.with_extension("snap.tmp");
    let header = SnapshotHeader {
        created_at: Utc::now(),
        entry_count: entries.len() as u64,
    };

    let result = (|| -> IoResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        let mut writer = BufWriter::new(file);
        codec::write_header(&mut writer)?;
        writer.write_all(&codec::encode(&header)?)?;
        writer.write_all(&codec::encode(entries)?)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    if let Some(parent) = path.parent() {
        sync_dir(parent)?;
    }
    Ok(header)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> IoResult<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> IoResult<()> {
    Ok(())
}
