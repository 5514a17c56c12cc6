//! Configuration.
//!
//! Everything has a default, so an empty JSON object is a valid config file.

use serde::{Deserialize, Serialize};

use crate::error::{NormError, ParameterError};
use crate::similarity::Threshold;

#[cfg(feature = "persistent")]
use crate::storage::PersistentConfig;

/// Default similarity cutoff for fuzzy tiers.
pub const DEFAULT_DIF_ACC: f64 = 0.7;

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Similarity cutoff, strictly inside (0, 1).
    pub dif_acc: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dif_acc: DEFAULT_DIF_ACC,
        }
    }
}

impl ResolverConfig {
    /// The validated cutoff.
    ///
    /// # Errors
    /// `ThresholdOutOfRange` unless `0.0 < dif_acc < 1.0`.
    pub fn threshold(&self) -> Result<Threshold, ParameterError> {
        Threshold::new(self.dif_acc)
    }

    /// Reject a cutoff outside (0, 1).
    ///
    /// # Errors
    /// `ThresholdOutOfRange` for such a cutoff.
    pub fn validate(self) -> Result<Self, ParameterError> {
        self.threshold()?;
        Ok(self)
    }
}

/// Top-level configuration, as read from a JSON file by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cascade settings.
    pub resolver: ResolverConfig,
    /// Durable store settings.
    #[cfg(feature = "persistent")]
    pub store: PersistentConfig,
}

impl Config {
    /// Check every section.
    ///
    /// # Errors
    /// - `InvalidParameter` for an out-of-range cutoff
    /// - `Database` for unusable store settings
    pub fn validate(self) -> Result<Self, NormError> {
        let resolver = self.resolver.validate()?;
        #[cfg(feature = "persistent")]
        let store = self.store.validate()?;
        Ok(Self {
            resolver,
            #[cfg(feature = "persistent")]
            store,
        })
    }
}
