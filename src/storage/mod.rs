//! Alias storage.
//!
//! [`AliasStore`] is the seam between the resolver and persistence. Two
//! backends ship with the crate: [`InMemoryAliasStore`] and, behind the
//! `persistent` feature, a durable WAL-backed store.

mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryAliasStore;
pub use traits::{AliasStore, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{open_store, CompactionResult, PersistentAliasStore, PersistentConfig};
