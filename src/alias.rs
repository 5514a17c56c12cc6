//! Alias dictionary data model.
//!
//! An alias is one spelling variant of a country name, stored case-folded and
//! mapped to a priority-tagged canonical name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, ParameterError};

/// Confidence tag attached to every alias entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    /// Official name, translation or abbreviation.
    High,
    /// Capital, region or other association.
    Low,
}

impl Priority {
    /// Numeric tag used on the wire and in legacy dumps.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Low => 2,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = InputError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::High),
            2 => Ok(Self::Low),
            value => Err(InputError::InvalidPriority { value }),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.tag()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The value half of an alias entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// How much the alias can be trusted.
    pub priority: Priority,
    /// The authoritative country name the alias maps to.
    pub canonical_name: String,
}

impl AliasEntry {
    /// Creates an entry, rejecting a blank canonical name.
    ///
    /// # Errors
    /// `InputError::EmptyCanonicalName` if the name is blank.
    pub fn new(priority: Priority, canonical_name: impl Into<String>) -> Result<Self, InputError> {
        let canonical_name = canonical_name.into();
        if canonical_name.trim().is_empty() {
            return Err(InputError::EmptyCanonicalName);
        }
        Ok(Self {
            priority,
            canonical_name,
        })
    }

    /// Parses the legacy tagged form, where the first character is the
    /// priority and the rest is the canonical name (`"1Russia"`).
    ///
    /// # Errors
    /// - `InvalidParameter` if the tag is neither `1` nor `2`
    /// - `InvalidInput` if the value or the name after the tag is empty
    pub fn from_tagged(alias: &str, tagged: &str) -> Result<Self, crate::NormError> {
        let mut chars = tagged.chars();
        let tag = chars.next().ok_or(InputError::EmptyCanonicalName)?;
        let priority = match tag {
            '1' => Priority::High,
            '2' => Priority::Low,
            other => {
                return Err(ParameterError::InvalidPriorityTag {
                    alias: alias.to_string(),
                    tag: other.to_string(),
                }
                .into())
            }
        };
        Ok(Self::new(priority, chars.as_str())?)
    }

    /// Renders the legacy tagged form.
    #[must_use]
    pub fn to_tagged(&self) -> String {
        format!("{}{}", self.priority.tag(), self.canonical_name)
    }
}

/// Case-folds an alias key and rejects blank ones.
///
/// Surrounding whitespace is kept: keys are stored exactly as folded.
///
/// # Errors
/// `InputError::EmptyAlias` for a blank key.
pub fn normalize_alias(key: &str) -> Result<String, InputError> {
    if key.trim().is_empty() {
        return Err(InputError::EmptyAlias);
    }
    Ok(key.to_lowercase())
}

/// Point-in-time copy of the alias dictionary.
///
/// Keys iterate in sorted order, which makes fuzzy tie-breaking reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSnapshot {
    entries: BTreeMap<String, AliasEntry>,
}

impl AliasSnapshot {
    /// Wraps an already-normalized map.
    #[must_use]
    pub fn new(entries: BTreeMap<String, AliasEntry>) -> Self {
        Self { entries }
    }

    /// Alias keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + Clone {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AliasEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AliasEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, AliasEntry> {
        self.entries
    }
}

impl FromIterator<(String, AliasEntry)> for AliasSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, AliasEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
