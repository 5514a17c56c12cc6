//! Bulk import and export of alias dictionaries.
//!
//! Two JSON shapes are accepted:
//!
//! ```json
//! [{"alias": "Россия", "canonical_name": "Russia", "priority": 1}]
//! ```
//!
//! and the legacy tagged map, where the first character of each value is the
//! priority:
//!
//! ```json
//! {"russia": "1Russia", "moscow": "2Russia"}
//! ```

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alias::{AliasEntry, Priority};
use crate::error::{InputError, NormResult};
use crate::operations::set_alias;
use crate::storage::AliasStore;

fn default_priority() -> u8 {
    Priority::Low.tag()
}

/// One alias in record form. Validation happens on import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRecord {
    /// Spelling variant, any case.
    pub alias: String,
    /// Name the alias resolves to.
    pub canonical_name: String,
    /// 1 or 2; defaults to 2 when omitted.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    Records(Vec<SeedRecord>),
    Tagged(BTreeMap<String, String>),
}

fn into_records(document: SeedDocument) -> NormResult<Vec<SeedRecord>> {
    match document {
        SeedDocument::Records(records) => Ok(records),
        SeedDocument::Tagged(map) => map
            .into_iter()
            .map(|(alias, tagged)| -> NormResult<SeedRecord> {
                let entry = AliasEntry::from_tagged(&alias, &tagged)?;
                Ok(SeedRecord {
                    alias,
                    canonical_name: entry.canonical_name,
                    priority: entry.priority.tag(),
                })
            })
            .collect(),
    }
}

/// Parse a seed document from a string.
///
/// # Errors
/// - `InvalidInput` if the JSON has neither accepted shape
/// - `InvalidParameter` for a bad tag in the legacy map
pub fn parse_seed(json: &str) -> NormResult<Vec<SeedRecord>> {
    let document: SeedDocument = serde_json::from_str(json).map_err(|e| InputError::MalformedSeed {
        reason: e.to_string(),
    })?;
    into_records(document)
}

/// Parse a seed document from a reader.
///
/// # Errors
/// Same as [`parse_seed`]; read failures count as malformed input.
pub fn read_seed(reader: impl Read) -> NormResult<Vec<SeedRecord>> {
    let document: SeedDocument =
        serde_json::from_reader(reader).map_err(|e| InputError::MalformedSeed {
            reason: e.to_string(),
        })?;
    into_records(document)
}

/// Apply `records` in order through [`set_alias`].
///
/// Stops at the first invalid record; earlier records stay applied.
///
/// # Errors
/// The first error [`set_alias`] reports.
pub fn import<S>(store: &S, records: &[SeedRecord]) -> NormResult<usize>
where
    S: AliasStore + ?Sized,
{
    for record in records {
        set_alias(store, &record.alias, &record.canonical_name, record.priority)?;
    }
    info!(count = records.len(), "imported aliases");
    Ok(records.len())
}

/// Every alias in the store, in key order.
///
/// # Errors
/// `Database` if the store cannot be read.
pub fn export<S>(store: &S) -> NormResult<Vec<SeedRecord>>
where
    S: AliasStore + ?Sized,
{
    Ok(store
        .snapshot()?
        .iter()
        .map(|(alias, entry)| SeedRecord {
            alias: alias.to_string(),
            canonical_name: entry.canonical_name.clone(),
            priority: entry.priority.tag(),
        })
        .collect())
}
