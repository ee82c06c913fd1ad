//! Directory watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges a synchronous
//! change source to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)              │
//! │  native: RecommendedWatcher callback ──► classify ──► filter ─┐  │
//! │  poll:   read_dir every interval ──► PollState diff ─► filter ┤  │
//! └───────────────────────────────────────────────────────────────│──┘
//!                                                         send    │
//!                                                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                         │
//! │  FileWatcher (shutdown ctrl)   mpsc::UnboundedReceiver ──► pipe  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both backends report every matching file already in the directory as
//! [`WatchEventKind::Created`] when they start, so files written while the
//! pipe was down are picked up.
//!
//! # Usage
//!
//! ```no_run
//! use lp_watcher::{FileWatcher, GlobFilter};
//! use lp_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatchConfig::default();
//!     let filter = GlobFilter::new(&["*.ndjson"])?;
//!
//!     let mut watcher = FileWatcher::new(Utf8Path::new("inbox/signals"), &config, filter).await?;
//!
//!     while let Some(event) = watcher.recv().await {
//!         println!("{} {}", event.kind, event.path);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher};
use smallvec::SmallVec;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lp_core::{WatchBackend, WatchConfig};

use crate::error::WatchError;
use crate::events::{WatchEvent, WatchEventKind};
use crate::filter::FileFilter;
use crate::poll::PollState;

/// A directory watcher that streams events to an async context.
///
/// `FileWatcher` manages a background thread running either the native
/// `notify` watcher or a polling loop. Events are filtered on that thread
/// and sent through an unbounded tokio channel, so the producer never
/// blocks on a slow consumer.
///
/// # Lifecycle
///
/// 1. **Creation**: `FileWatcher::new()` validates the directory, creates
///    channels, and spawns the blocking task for the configured backend.
///
/// 2. **Event Reception**: Use `recv()` or `try_recv()` to receive events.
///    Events are already filtered according to the provided filter.
///
/// 3. **Shutdown**: Call `shutdown()` for graceful shutdown, or simply drop
///    the watcher. Dropping sends a shutdown signal without awaiting the task.
///
/// # Examples
///
/// ```no_run
/// use lp_watcher::{AcceptAllFilter, FileWatcher};
/// use lp_core::WatchConfig;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), lp_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("inbox/signals"),
///     &WatchConfig::default(),
///     AcceptAllFilter,
/// ).await?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("Changed: {}", event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender.
    ///
    /// Set to `None` after shutdown is initiated. Dropping it also wakes the
    /// blocking task.
    shutdown_tx: Option<std_mpsc::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,

    /// The canonical path being watched.
    watch_path: Utf8PathBuf,

    /// The backend in use.
    backend: WatchBackend,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("backend", &self.backend)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Creates a new watcher for the specified directory.
    ///
    /// Watching is non-recursive: only files directly inside `path` are
    /// reported, and directory entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist,
    /// [`WatchError::NotADirectory`] if it is not a directory, and
    /// [`WatchError::Io`] if it cannot be canonicalized. If the native
    /// watcher cannot be set up (for example when inotify limits are
    /// exhausted) the thread logs a warning and polls instead.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }
        if !path.is_dir() {
            return Err(WatchError::NotADirectory(path.to_path_buf()));
        }

        let watch_path = path.canonicalize_utf8().map_err(WatchError::Io)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();

        let task_path = watch_path.clone();
        let backend = config.backend;
        let poll_interval = config.poll_interval();

        let task_handle = tokio::task::spawn_blocking(move || match backend {
            WatchBackend::Poll => {
                run_poll_loop(&task_path, poll_interval, &event_tx, &shutdown_rx, &filter)
            }
            _ => run_native_loop(&task_path, poll_interval, event_tx, &shutdown_rx, filter),
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
            backend,
        })
    }

    /// Receives the next event asynchronously.
    ///
    /// Returns `None` once the watcher thread has exited and every queued
    /// event has been received.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }

    /// Tries to receive an event without blocking.
    ///
    /// # Errors
    ///
    /// Returns `TryRecvError::Empty` if no event is queued, or
    /// `TryRecvError::Disconnected` if the watcher thread has exited.
    pub fn try_recv(&mut self) -> Result<WatchEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns the backend in use.
    #[must_use]
    pub const fn backend(&self) -> WatchBackend {
        self.backend
    }

    /// Returns `true` if the watcher thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Gracefully shuts down the watcher and waits for its thread.
    ///
    /// # Errors
    ///
    /// Returns the error the watcher thread exited with, or
    /// [`WatchError::ChannelClosed`] if it panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the thread already exited
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Translates a raw notify event into zero or more watch events.
///
/// A rename reported as a single event carries both paths: the source
/// becomes a deletion and the destination a move.
fn classify_event(event: &notify::Event) -> SmallVec<[(&std::path::Path, WatchEventKind); 2]> {
    let mut out = SmallVec::new();
    let mut paths = event.paths.iter().map(std::path::PathBuf::as_path);

    match event.kind {
        EventKind::Create(_) => out.extend(paths.map(|p| (p, WatchEventKind::Created))),
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            out.extend(paths.map(|p| (p, WatchEventKind::Deleted)));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            out.extend(paths.map(|p| (p, WatchEventKind::Moved)));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let Some(from) = paths.next() {
                out.push((from, WatchEventKind::Deleted));
            }
            if let Some(to) = paths.next() {
                out.push((to, WatchEventKind::Moved));
            }
        }
        // Platforms that cannot tell the two ends of a rename apart
        EventKind::Modify(ModifyKind::Name(_)) => out.extend(paths.map(|p| {
            let kind = if p.exists() {
                WatchEventKind::Moved
            } else {
                WatchEventKind::Deleted
            };
            (p, kind)
        })),
        EventKind::Modify(_) | EventKind::Any => {
            out.extend(paths.map(|p| (p, WatchEventKind::Modified)));
        }
        EventKind::Access(_) | EventKind::Other => {}
    }
    out
}

/// Applies the filter and sends one event. Returns `false` once the
/// receiver is gone.
fn forward<F: FileFilter + ?Sized>(
    path: &std::path::Path,
    kind: WatchEventKind,
    filter: &F,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
) -> bool {
    let path = match Utf8PathBuf::try_from(path.to_path_buf()) {
        Ok(p) => p,
        Err(e) => {
            let err = WatchError::non_utf8_path(e.into_path_buf());
            tracing::warn!(error = %err, recoverable = err.is_recoverable(), "Skipping file event");
            return true;
        }
    };

    if !kind.is_deletion() && path.is_dir() {
        return true;
    }
    if !filter.should_process(&path) {
        tracing::trace!(path = %path, "Filtered out file event");
        return true;
    }

    event_tx.send(WatchEvent::new(path, kind)).is_ok()
}

/// Runs the native notify watcher in a blocking context, polling instead if
/// it cannot be set up.
fn run_native_loop<F: FileFilter>(
    path: &Utf8Path,
    poll_interval: Duration,
    event_tx: mpsc::UnboundedSender<WatchEvent>,
    shutdown_rx: &std_mpsc::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    run_native_or_poll(path, poll_interval, &event_tx, shutdown_rx, filter, start_native)
}

fn run_native_or_poll<F, W, S>(
    path: &Utf8Path,
    poll_interval: Duration,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
    shutdown_rx: &std_mpsc::Receiver<()>,
    filter: F,
    start: S,
) -> Result<(), WatchError>
where
    F: FileFilter,
    S: FnOnce(&Utf8Path, &Arc<F>, &mpsc::UnboundedSender<WatchEvent>) -> Result<W, WatchError>,
{
    let filter = Arc::new(filter);

    let watcher = match start(path, &filter, event_tx) {
        Ok(watcher) => watcher,
        Err(error) => {
            tracing::warn!(path = %path, error = %error, "Native watcher unavailable, falling back to polling");
            return run_poll_loop(path, poll_interval, event_tx, shutdown_rx, &*filter);
        }
    };

    tracing::info!(path = %path, backend = "native", "File watcher started");

    // Block until shutdown is requested or the FileWatcher is dropped
    let _ = shutdown_rx.recv();
    drop(watcher);

    tracing::info!(path = %path, "File watcher stopped");
    Ok(())
}

/// Arms a non-recursive notify watch on `path` and reports existing files.
fn start_native<F: FileFilter>(
    path: &Utf8Path,
    filter: &Arc<F>,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
) -> Result<notify::RecommendedWatcher, WatchError> {
    let callback_filter = Arc::clone(filter);
    let callback_tx = event_tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                for (p, kind) in classify_event(&event) {
                    if !forward(p, kind, &*callback_filter, &callback_tx) {
                        tracing::debug!("Event channel closed, dropping notify event");
                        break;
                    }
                }
            }
            Err(error) => tracing::warn!(error = %error, "Native watcher error"),
        }
    })?;

    // Watch before listing so nothing written in between is lost.
    watcher.watch(path.as_std_path(), RecursiveMode::NonRecursive)?;
    emit_existing(path, &**filter, event_tx)?;
    Ok(watcher)
}

/// Reports every matching file already in `dir` as created.
fn emit_existing<F: FileFilter + ?Sized>(
    dir: &Utf8Path,
    filter: &F,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
) -> Result<(), WatchError> {
    let mut existing = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    existing.sort();

    for p in existing {
        if !forward(&p, WatchEventKind::Created, filter, event_tx) {
            break;
        }
    }
    Ok(())
}

/// Runs the polling loop in a blocking context.
fn run_poll_loop<F: FileFilter>(
    path: &Utf8Path,
    interval: Duration,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
    shutdown_rx: &std_mpsc::Receiver<()>,
    filter: &F,
) -> Result<(), WatchError> {
    let mut state = PollState::new();

    tracing::info!(path = %path, backend = "poll", interval = ?interval, "File watcher started");

    loop {
        match state.scan(path, filter) {
            Ok(events) => {
                for event in events {
                    if event_tx.send(event).is_err() {
                        tracing::debug!("Event channel closed, stopping poller");
                        return Ok(());
                    }
                }
            }
            Err(error) => tracing::warn!(path = %path, error = %error, "Directory poll failed"),
        }

        match shutdown_rx.recv_timeout(interval) {
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(path = %path, "File watcher stopped");
    Ok(())
}
