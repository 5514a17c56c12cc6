//! Write-ahead log for alias mutations.
//!
//! Every `set`/`delete` is appended and flushed here before the in-memory
//! index changes. On open the log is replayed on top of the last snapshot.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [RECORD 1: codec frame of WalRecord]
//! [RECORD 2: codec frame of WalRecord]
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alias::AliasEntry;

use super::codec;

/// Size of the magic + version header.
const HEADER_LEN: u64 = 5;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Monotonically increasing, restarting at 1 after each truncation.
    pub sequence: u64,
    /// Wall-clock time of the append.
    pub timestamp: DateTime<Utc>,
    /// The logged mutation.
    pub op: WalOp,
}

/// The mutation carried by a [`WalRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOp {
    /// Insert or overwrite an alias.
    Set {
        /// Case-folded alias key.
        key: String,
        /// Value stored under `key`.
        entry: AliasEntry,
    },
    /// Remove an alias.
    Delete {
        /// Case-folded alias key.
        key: String,
    },
    /// Everything up to `up_to_sequence` is in the snapshot.
    Checkpoint {
        /// Last sequence folded into the snapshot.
        up_to_sequence: u64,
    },
}

struct WalState {
    writer: Option<BufWriter<File>>,
    sequence: u64,
}

/// Append-only mutation log. Thread-safe via an internal mutex.
pub struct WriteAheadLog {
    path: PathBuf,
    state: Mutex<WalState>,
    sync_on_write: bool,
}

fn poisoned() -> std::io::Error {
    std::io::Error::new(ErrorKind::Other, "poisoned lock: wal")
}

impl WriteAheadLog {
    /// Open or create the log at `path`.
    ///
    /// A torn or corrupt tail is cut off so new records land after the last
    /// valid one.
    ///
    /// # Errors
    /// I/O failures, a bad magic, or a header from another codec version.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<Self> {
        let exists = path.exists() && std::fs::metadata(path)?.len() >= HEADER_LEN;

        let sequence = if exists {
            let (last_sequence, valid_len) = Self::scan(path)?;
            let file = OpenOptions::new().write(true).open(path)?;
            if file.metadata()?.len() > valid_len {
                warn!(
                    path = %path.display(),
                    valid_len,
                    "discarding corrupt WAL tail after sequence {last_sequence}"
                );
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
            last_sequence
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            0
        };

        let file = OpenOptions::new().append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(WalState {
                writer: Some(BufWriter::new(file)),
                sequence,
            }),
            sync_on_write,
        })
    }

    /// Append a mutation, returning its sequence number.
    ///
    /// # Errors
    /// Encoding or write failures; nothing is counted as appended then.
    pub fn append(&self, op: WalOp) -> IoResult<u64> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let sequence = state.sequence + 1;
        let record = WalRecord {
            sequence,
            timestamp: Utc::now(),
            op,
        };
        let encoded = codec::encode(&record)?;

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::Other, "WAL writer is closed"))?;
        writer.write_all(&encoded)?;
        writer.flush()?;
        if self.sync_on_write {
            writer.get_ref().sync_all()?;
        }

        state.sequence = sequence;
        Ok(sequence)
    }

    /// Iterate over all records from the start of the file.
    ///
    /// # Errors
    /// If the file cannot be opened or its header is invalid.
    pub fn iter(&self) -> IoResult<WalIterator> {
        WalIterator::new(&self.path)
    }

    /// Sequence number of the last appended record.
    pub fn current_sequence(&self) -> u64 {
        self.state.lock().map_or(0, |s| s.sequence)
    }

    /// Log file size in bytes.
    ///
    /// # Errors
    /// If the file metadata cannot be read.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Drop every record and start over with a bare header.
    ///
    /// Only call this once the records are durable elsewhere (snapshot).
    ///
    /// # Errors
    /// If the file cannot be rewritten.
    pub fn truncate(&self) -> IoResult<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        codec::write_header(&mut file)?;
        if self.sync_on_write {
            file.sync_all()?;
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        state.writer = Some(BufWriter::new(file));
        state.sequence = 0;
        Ok(())
    }

    /// Last valid sequence number and the byte length of the valid prefix.
    fn scan(path: &Path) -> IoResult<(u64, u64)> {
        let mut iter = WalIterator::new(path)?;
        let mut last_sequence = 0;
        let mut valid_len = iter.position()?;

        while let Some(result) = iter.next() {
            match result {
                Ok(record) => {
                    last_sequence = record.sequence;
                    valid_len = iter.position()?;
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        "WAL corruption detected at sequence {}: {e}",
                        last_sequence + 1
                    );
                    break;
                }
            }
        }

        Ok((last_sequence, valid_len))
    }
}

/// Iterator over WAL records.
///
/// A frame cut short by a crash ends the iteration silently; any other
/// decoding failure is yielded as an error.
pub struct WalIterator {
    reader: BufReader<File>,
    file_size: u64,
}

impl WalIterator {
    fn new(path: &Path) -> IoResult<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        codec::read_header(&mut reader)?;
        Ok(Self { reader, file_size })
    }

    fn position(&mut self) -> IoResult<u64> {
        self.reader.stream_position()
    }
}

impl Iterator for WalIterator {
    type Item = IoResult<WalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.position() {
            Ok(pos) if pos >= self.file_size => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e)),
        }

        match codec::decode(&mut self.reader) {
            Ok(record) => Some(Ok(record)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }
}
