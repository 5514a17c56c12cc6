//! Alias mutation operations.
//!
//! These validate and case-fold their arguments before the store sees them,
//! so a rejected call never touches storage.

use tracing::debug;

use crate::alias::{normalize_alias, AliasEntry, Priority};
use crate::error::NormResult;
use crate::storage::AliasStore;

/// Map `key` to `canonical_name` with the given priority tag (1 or 2).
///
/// Overwrites any existing entry for the case-folded key.
///
/// # Errors
/// - `InvalidInput` for a blank key or name, or a priority other than 1/2
/// - `Database` if the store fails
pub fn set_alias<S>(store: &S, key: &str, canonical_name: &str, priority: u8) -> NormResult<()>
where
    S: AliasStore + ?Sized,
{
    let key = normalize_alias(key)?;
    let priority = Priority::try_from(priority)?;
    let entry = AliasEntry::new(priority, canonical_name)?;

    debug!(alias = %key, canonical = %entry.canonical_name, %priority, "set alias");
    store.put(key, entry)?;
    Ok(())
}

/// Remove the alias `key`. Returns whether it existed; absence is not an error.
///
/// # Errors
/// - `InvalidInput` for a blank key
/// - `Database` if the store fails
pub fn delete_alias<S>(store: &S, key: &str) -> NormResult<bool>
where
    S: AliasStore + ?Sized,
{
    let key = normalize_alias(key)?;
    let removed = store.remove(&key)?;
    debug!(alias = %key, removed, "delete alias");
    Ok(removed)
}
