//! Error types for the lp-pipe crate.
//!
//! This module provides [`PipeError`] for start-up and I/O failures of the
//! pipe itself and [`DispatchError`] for failures reported by a downstream
//! consumer.

use camino::Utf8PathBuf;

use lp_core::ConfigError;
use lp_watcher::WatchError;

/// Errors that can occur while setting up or running the pipe.
///
/// # Error Recovery Strategy
///
/// - **Config errors** ([`PipeError::Config`]): Fatal - returned from `LivePipe::new`
/// - **Watch errors** ([`PipeError::Watch`]): Fatal at start-up
/// - **I/O errors** ([`PipeError::Io`]): Recoverable once running - the
///   affected file is skipped and the loop continues
/// - **Serialization errors** ([`PipeError::Serialize`]): Recoverable
///
/// # Examples
///
/// ```
/// use lp_pipe::PipeError;
/// use std::io;
///
/// let err = PipeError::io("artifacts/dlq/a.bad.ndjson", io::Error::other("disk full"));
/// assert!(err.is_recoverable());
/// assert!(err.to_string().contains("a.bad.ndjson"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Invalid pipe configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The watcher could not be started.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A file operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipeError {
    /// Creates a new [`PipeError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the running pipe can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Serialize(_))
    }

    /// Returns `true` if this error prevents the pipe from running.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Watch(e) => e.path(),
            Self::Config(_) | Self::Serialize(_) => None,
        }
    }
}

/// A batch-level failure reported by a downstream consumer.
///
/// Returning this from [`SignalConsumer::dispatch`](crate::SignalConsumer::dispatch)
/// makes the dispatcher retry the whole batch. Per-record rejections are not
/// errors; report them in the
/// [`DispatchOutcome`](crate::DispatchOutcome) instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DispatchError {
    message: String,
}

impl DispatchError {
    /// Creates a dispatch error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_pipe_error_io() {
        let err = PipeError::io("state/a.json", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_recoverable());
        assert_eq!(err.path().map(|p| p.as_str()), Some("state/a.json"));
    }

    #[test]
    fn test_pipe_error_config_is_fatal() {
        let err = PipeError::from(ConfigError::invalid_option("batch_max", "must be at least 1"));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("batch_max"));
    }

    #[test]
    fn test_pipe_error_watch_path() {
        let err = PipeError::from(WatchError::path_not_found("inbox/signals"));
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("inbox/signals"));
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::new("consumer unavailable");
        assert_eq!(err.to_string(), "consumer unavailable");
        assert_eq!(err.message(), "consumer unavailable");

        let from_io = DispatchError::from(io::Error::other("broken pipe"));
        assert!(from_io.message().contains("broken pipe"));
    }
}
