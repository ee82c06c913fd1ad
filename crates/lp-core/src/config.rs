//! Configuration structures for the live ingestion pipe.
//!
//! - [`WatchConfig`] - Filesystem watcher settings (backend, poll interval)
//! - [`PipeConfig`] - Root configuration: directories, batching, retries,
//!   deduplication
//!
//! All configuration types implement [`Default`] with the values the pipe
//! ships with, and deserialize with `#[serde(default)]` so a config file only
//! needs to name the options it changes.

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which mechanism the watcher uses to detect file changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum WatchBackend {
    /// Native OS notifications through `notify`.
    #[default]
    Native,
    /// Periodic directory listing diffed against the previous listing.
    Poll,
}

/// Configuration for the filesystem watcher.
///
/// # Examples
///
/// ```
/// use lp_core::{WatchBackend, WatchConfig};
///
/// let config = WatchConfig::default();
/// assert_eq!(config.backend, WatchBackend::Native);
/// assert_eq!(config.poll_interval_ms, 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Change detection backend.
    pub backend: WatchBackend,

    /// Interval between directory listings for the polling backend.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: WatchBackend::Native,
            poll_interval_ms: 1000,
        }
    }
}

impl WatchConfig {
    /// Returns the polling interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Root configuration for the live pipe.
///
/// # Examples
///
/// ```
/// use lp_core::PipeConfig;
///
/// let config = PipeConfig::default();
/// assert_eq!(config.file_glob, "*.ndjson");
/// assert_eq!(config.batch_max, 256);
/// assert_eq!(config.dedupe_window, 10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Directory watched for NDJSON signal files.
    pub watch_dir: Utf8PathBuf,

    /// Directory holding one offset checkpoint per watched file.
    pub state_dir: Utf8PathBuf,

    /// Directory receiving dead-letter files.
    pub dlq_dir: Utf8PathBuf,

    /// Directory receiving the operational event log.
    pub log_dir: Utf8PathBuf,

    /// Glob matched against file names inside `watch_dir`.
    pub file_glob: String,

    /// Delay between a change notification and the read pass it triggers.
    pub debounce_ms: u64,

    /// Number of records that triggers an immediate flush.
    pub batch_max: usize,

    /// Time since the last flush after which a pending batch is flushed.
    pub batch_timeout_ms: u64,

    /// Dispatch attempts per batch before it is quarantined.
    pub retry_max: u32,

    /// Fixed delay between dispatch attempts.
    pub retry_backoff_ms: u64,

    /// Capacity of the duplicate-suppression window. Zero disables it.
    pub dedupe_window: usize,

    /// Watcher settings.
    pub watch: WatchConfig,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            watch_dir: Utf8PathBuf::from("inbox/signals"),
            state_dir: Utf8PathBuf::from("artifacts/pipe_state"),
            dlq_dir: Utf8PathBuf::from("artifacts/dlq"),
            log_dir: Utf8PathBuf::from("artifacts/pipe_logs"),
            file_glob: "*.ndjson".to_owned(),
            debounce_ms: 400,
            batch_max: 256,
            batch_timeout_ms: 1000,
            retry_max: 5,
            retry_backoff_ms: 500,
            dedupe_window: 10_000,
            watch: WatchConfig::default(),
        }
    }
}

impl PipeConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Options missing from the file keep their defaults.
    pub fn from_json_file(path: &camino::Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks option values that would make the pipe misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_max == 0 {
            return Err(ConfigError::invalid_option("batch_max", "must be at least 1"));
        }
        if self.retry_max == 0 {
            return Err(ConfigError::invalid_option("retry_max", "must be at least 1"));
        }
        if self.file_glob.trim().is_empty() {
            return Err(ConfigError::invalid_option("file_glob", "must not be empty"));
        }
        if let Err(e) = glob::Pattern::new(&self.file_glob) {
            return Err(ConfigError::invalid_option("file_glob", e.msg));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.poll_interval_ms",
                "must be at least 1",
            ));
        }
        for (option, dir) in [
            ("watch_dir", &self.watch_dir),
            ("state_dir", &self.state_dir),
            ("dlq_dir", &self.dlq_dir),
            ("log_dir", &self.log_dir),
        ] {
            if dir.as_str().is_empty() {
                return Err(ConfigError::invalid_option(option, "must not be empty"));
            }
        }
        Ok(())
    }

    /// Returns the debounce delay.
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the batch timeout.
    #[inline]
    #[must_use]
    pub const fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Returns the delay between dispatch attempts.
    #[inline]
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Returns the directories the pipe creates on start-up.
    #[must_use]
    pub fn directories(&self) -> [&Utf8PathBuf; 4] {
        [&self.watch_dir, &self.state_dir, &self.dlq_dir, &self.log_dir]
    }
}
