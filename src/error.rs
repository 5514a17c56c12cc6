//! Error types for country-norm.
//!
//! All errors are strongly typed using thiserror. Validation failures are
//! split into malformed input (`InputError`) and out-of-range tunables
//! (`ParameterError`); persistence failures arrive as a `StorageError` from
//! the alias store and are surfaced unmodified.

use thiserror::Error;

use crate::storage::StorageError;

/// Malformed or empty input to sanitization, resolution or alias mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Input cannot be empty")]
    Empty,

    #[error("Input '{raw}' is empty after removing punctuation and digits")]
    EmptyAfterSanitize {
        raw: String,
    },

    #[error("Alias key cannot be empty")]
    EmptyAlias,

    #[error("Canonical name cannot be empty")]
    EmptyCanonicalName,

    #[error("Priority {value} is invalid; expected 1 (high) or 2 (low)")]
    InvalidPriority {
        value: u8,
    },

    #[error("Malformed seed data: {reason}")]
    MalformedSeed {
        reason: String,
    },
}

/// Out-of-range tunables, or corrupt tags reaching the resolver from data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("Similarity threshold {value} must lie strictly between 0.0 and 1.0")]
    ThresholdOutOfRange {
        value: f64,
    },

    #[error("Priority tag '{tag}' on alias '{alias}' is invalid; expected '1' or '2'")]
    InvalidPriorityTag {
        alias: String,
        tag: String,
    },
}

/// Top-level error type for country-norm.
#[derive(Debug, Error)]
pub enum NormError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ParameterError),

    #[error("Database error: {0}")]
    Database(#[from] StorageError),
}

impl NormError {
    /// Returns true if this is an input validation error.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns true if this is a parameter validation error.
    #[must_use]
    pub const fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    /// Returns true if the alias store failed.
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns true if this error may clear up on retry.
    ///
    /// Nothing here retries on its own; this only informs callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidInput(_) | Self::InvalidParameter(_) => false,
            Self::Database(e) => matches!(e, StorageError::Locked(_)),
        }
    }
}

/// Result type alias for country-norm operations.
pub type NormResult<T> = Result<T, NormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::EmptyAfterSanitize {
            raw: "!!!".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("!!!"));
        assert!(msg.contains("empty after"));
    }

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::ThresholdOutOfRange { value: 1.5 };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("strictly between"));
    }

    #[test]
    fn test_norm_error_from_input() {
        let err: NormError = InputError::Empty.into();
        assert!(err.is_invalid_input());
        assert!(!err.is_invalid_parameter());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_norm_error_from_parameter() {
        let err: NormError = ParameterError::ThresholdOutOfRange { value: 0.0 }.into();
        assert!(err.is_invalid_parameter());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_norm_error_from_storage() {
        let err: NormError = StorageError::Backend("disk full".to_string()).into();
        assert!(err.is_database());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("disk full"));

        let err: NormError = StorageError::Locked("held by pid 42".to_string()).into();
        assert!(err.is_retryable());
    }
}
