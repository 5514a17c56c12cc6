//! # country-norm - Country name normalization
//!
//! Resolves free-text spellings of a country name (native names,
//! translations, abbreviations, capitals, regions) to one canonical name.
//! Lookups go through a case-folded alias dictionary; when no alias matches
//! exactly, an eight-tier fuzzy cascade picks the most specific acceptable
//! match.
//!
//! ## Core Concepts
//!
//! - **Alias**: one spelling variant, stored lowercase
//! - **Priority**: 1 for names, translations and abbreviations; 2 for
//!   capitals, regions and other associations
//! - **Tier**: one step of the cascade, defined by how the query is shaped,
//!   which priority it accepts, and how lengths must compare
//! - **Similarity ratio**: the gestalt score `2·M / T` used to accept or
//!   reject a fuzzy candidate
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use country_norm::{InMemoryAliasStore, Resolver};
//!
//! let resolver = Resolver::new(Arc::new(InMemoryAliasStore::new()));
//! resolver.set_alias("Russia", "Russia", 1)?;
//! resolver.set_alias("Moscow", "Russia", 2)?;
//!
//! let found = resolver.resolve("Rusia")?;
//! assert_eq!(found.canonical_name(), Some("Russia"));
//!
//! let missing = resolver.resolve("Atlantis")?;
//! assert!(!missing.is_found());
//! # Ok::<(), country_norm::NormError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alias;
pub mod config;
pub mod error;
pub mod operations;
pub mod resolver;
pub mod sanitize;
pub mod seed;
pub mod similarity;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use alias::{AliasEntry, AliasSnapshot, Priority};
pub use config::{Config, ResolverConfig, DEFAULT_DIF_ACC};
pub use error::{InputError, NormError, NormResult, ParameterError};
pub use operations::{delete_alias, set_alias};
pub use resolver::{resolve, Resolution, ResolvedName, Resolver};
pub use sanitize::sanitize;
pub use similarity::{best_match, gestalt_ratio, GestaltMatcher, ScoredMatch, Threshold};
pub use storage::{AliasStore, InMemoryAliasStore, StorageError};

#[cfg(feature = "persistent")]
pub use storage::{open_store, PersistentAliasStore, PersistentConfig};
