//! Error types for the lp-core crate.
//!
//! This module provides [`ConfigError`] for configuration failures and
//! [`ValidationError`] for records that decode as JSON but do not satisfy the
//! signal schema.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// This error type covers all configuration-related failures including
/// path validation, out-of-range options, and parsing errors.
///
/// # Examples
///
/// ```
/// use lp_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist and could not be created.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// A decoded JSON value that is not a valid [`Signal`](crate::Signal).
///
/// Validation failures are never fatal: the pipe writes the raw value and the
/// error message to the dead-letter store and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The value is not a JSON object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The object does not have the shape of a signal (missing or unknown
    /// fields, wrong field types).
    #[error("record does not match the signal shape: {0}")]
    Shape(#[from] serde_json::Error),

    /// A required string field is empty.
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// A numeric field is outside its permitted range or not finite.
    #[error("field '{field}' must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// The `side` field is not a recognised direction.
    #[error("field 'side' must be one of LONG, SHORT, FLAT, got '{0}'")]
    InvalidSide(String),

    /// The `timestamp` field is not an RFC 3339 date-time.
    #[error("field 'timestamp' is not an RFC 3339 date-time: '{0}'")]
    InvalidTimestamp(String),
}

impl ValidationError {
    /// Returns the name of the field the error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::EmptyField(field) | Self::OutOfRange { field, .. } => Some(field),
            Self::InvalidSide(_) => Some("side"),
            Self::InvalidTimestamp(_) => Some("timestamp"),
            Self::NotAnObject(_) | Self::Shape(_) => None,
        }
    }
}
