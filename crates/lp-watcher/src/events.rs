//! Event types for file change notifications.
//!
//! This module provides the [`WatchEvent`] emitted by both watcher backends
//! and the [`WatchEventKind`] classifying it.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//! notify callback / directory poll diff
//!        │
//!        ▼
//!   glob filter ──► WatchEvent created
//!        │
//!        ▼
//!   Sent via unbounded channel to the pipe main loop
//! ```

use std::fmt;
use std::time::Instant;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    /// The file appeared (or was present when the watcher started).
    Created,
    /// The file's contents or metadata changed.
    Modified,
    /// The file was removed, or renamed away.
    Deleted,
    /// The file was renamed into place.
    Moved,
}

impl WatchEventKind {
    /// Returns `true` for [`WatchEventKind::Deleted`].
    #[inline]
    #[must_use]
    pub const fn is_deletion(self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Returns the lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Moved => "moved",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A change to a file inside the watched directory.
///
/// Events are ephemeral: the watcher produces them onto a FIFO channel and
/// the consumer handles each exactly once.
///
/// # Examples
///
/// ```
/// use lp_watcher::{WatchEvent, WatchEventKind};
/// use camino::Utf8PathBuf;
///
/// let event = WatchEvent::new(Utf8PathBuf::from("/inbox/signals.ndjson"), WatchEventKind::Created);
/// assert_eq!(event.file_name(), Some("signals.ndjson"));
/// assert!(!event.kind.is_deletion());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the file that changed.
    pub path: Utf8PathBuf,

    /// Classification of the change.
    pub kind: WatchEventKind,

    /// When the watcher observed the change.
    pub timestamp: Instant,
}

impl WatchEvent {
    /// Creates a new event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: WatchEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Creates a `created` event.
    #[inline]
    #[must_use]
    pub fn created(path: Utf8PathBuf) -> Self {
        Self::new(path, WatchEventKind::Created)
    }

    /// Creates a `modified` event.
    #[inline]
    #[must_use]
    pub fn modified(path: Utf8PathBuf) -> Self {
        Self::new(path, WatchEventKind::Modified)
    }

    /// Creates a `deleted` event.
    #[inline]
    #[must_use]
    pub fn deleted(path: Utf8PathBuf) -> Self {
        Self::new(path, WatchEventKind::Deleted)
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}
