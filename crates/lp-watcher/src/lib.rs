//! Directory watching with native and polling backends and async event
//! streaming.
//!
//! This crate reports changes to NDJSON drop files inside a single watched
//! directory, bridged to a tokio context for the pipe main loop.
//!
//! # Overview
//!
//! - **Native backend**: OS notifications through `notify`, classified into
//!   created/modified/deleted/moved
//! - **Polling backend**: periodic directory listing diffed on modification
//!   time and size, for filesystems where notifications are unreliable
//! - **Filtering at source**: a [`GlobFilter`] on the file name is applied
//!   on the watcher thread
//! - **Startup scan**: files already present are reported as created
//!
//! Events are delivered through an unbounded FIFO channel. The consumer is
//! expected to debounce; the watcher forwards every change it sees.
//!
//! # Crate Dependencies
//!
//! ```text
//! lp-cli ──► lp-pipe ──► lp-watcher ──► lp-core
//!                   └──────────────────►
//! ```
//!
//! # Using with `tokio::select!`
//!
//! ```no_run
//! use lp_watcher::{FileWatcher, GlobFilter};
//! use lp_core::{WatchBackend, WatchConfig};
//! use camino::Utf8Path;
//! use tokio::time::{interval, Duration};
//!
//! # async fn example() -> Result<(), lp_watcher::WatchError> {
//! let config = WatchConfig { backend: WatchBackend::Poll, poll_interval_ms: 250 };
//! let mut watcher = FileWatcher::new(
//!     Utf8Path::new("inbox/signals"),
//!     &config,
//!     GlobFilter::new(&["*.ndjson"])?,
//! ).await?;
//!
//! let mut tick = interval(Duration::from_millis(100));
//!
//! loop {
//!     tokio::select! {
//!         Some(event) = watcher.recv() => {
//!             println!("{}: {}", event.kind, event.path);
//!         }
//!         _ = tick.tick() => {
//!             // Flush pending work
//!         }
//!     }
//! }
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod poll;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{WatchEvent, WatchEventKind};

// Re-export filter types
pub use filter::{AcceptAllFilter, FileFilter, GlobFilter};

// Re-export watcher types
pub use poll::PollState;
pub use watcher::FileWatcher;
