//! The live pipe main loop and its lifecycle.
//!
//! # Event Flow
//!
//! ```text
//! FileWatcher ──► unbounded queue ──► main loop
//!                                       │ deleted: forget offset
//!                                       │ other:   debounce, tail
//!                                       ▼
//!                         validate ──► dedup ──► batcher ──► dispatcher ──► consumer
//!                            │                                   │
//!                            ▼                                   ▼
//!                  invalid_signal.ndjson            dispatch_fail_<id>.ndjson
//! ```
//!
//! The loop waits at most 100 ms at a time for a watcher event, so timeout
//! flushes and stop requests are noticed without file activity.
//!
//! # Lifecycle
//!
//! `Created ──run()──► Running ──stop()──► Stopping ──final flush──► Stopped`

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lp_core::PipeConfig;
use lp_watcher::{FileWatcher, GlobFilter, WatchEvent};

use crate::batch::{Batch, Batcher};
use crate::dedup::DedupWindow;
use crate::dispatch::{Dispatcher, SignalConsumer};
use crate::dlq::DeadLetterStore;
use crate::error::PipeError;
use crate::event_log::EventLog;
use crate::stats::{PipeStats, StatsSnapshot};
use crate::tailer::Tailer;
use crate::validate::{SchemaValidator, SignalValidator};

/// Longest the main loop blocks waiting for a watcher event.
const LOOP_TICK: Duration = Duration::from_millis(100);

/// Lifecycle state of a [`LivePipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeState {
    /// Directories exist and state is initialized; not yet running.
    Created,
    /// The watcher is active and the main loop is consuming events.
    Running,
    /// A stop was requested; the final flush is in progress.
    Stopping,
    /// Terminal.
    Stopped,
}

/// A cloneable handle for observing and stopping a pipe.
///
/// # Examples
///
/// ```no_run
/// use lp_pipe::{DispatchError, DispatchOutcome, LivePipe, PipeState, SignalConsumer};
/// use lp_core::{PipeConfig, Signal};
///
/// struct Sink;
///
/// impl SignalConsumer for Sink {
///     async fn dispatch(&self, signals: &[Signal]) -> Result<DispatchOutcome, DispatchError> {
///         Ok(DispatchOutcome::all_accepted(signals.len()))
///     }
/// }
///
/// # async fn example() -> Result<(), lp_pipe::PipeError> {
/// let pipe = LivePipe::new(PipeConfig::default(), Sink)?;
/// let handle = pipe.handle();
///
/// let task = tokio::spawn(pipe.run());
/// // ... later, from anywhere
/// handle.stop();
/// let stats = task.await.expect("pipe task panicked")?;
/// assert_eq!(handle.state(), PipeState::Stopped);
/// println!("admitted {} signals", stats.admitted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PipeHandle {
    cancel: CancellationToken,
    state: Arc<Mutex<PipeState>>,
    stats: Arc<PipeStats>,
}

impl PipeHandle {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            state: Arc::new(Mutex::new(PipeState::Created)),
            stats: Arc::new(PipeStats::new()),
        }
    }

    /// Requests a cooperative stop.
    ///
    /// The main loop finishes its current iteration, flushes any pending
    /// batch and returns. Calling this more than once is harmless.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, PipeState::Created | PipeState::Running) {
                *state = PipeState::Stopping;
            }
        }
        self.cancel.cancel();
    }

    /// Returns `true` once a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipeState {
        *self.state.lock()
    }

    /// Returns a snapshot of the pipe's counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn set_state(&self, next: PipeState) {
        *self.state.lock() = next;
    }

    /// Moves `Created` to `Running`, leaving a concurrent stop in place.
    fn mark_running(&self) {
        let mut state = self.state.lock();
        if *state == PipeState::Created {
            *state = PipeState::Running;
        }
    }
}

/// Watches a directory and delivers validated, deduplicated signals to a
/// consumer in batches.
///
/// The pipe owns its offsets, dedup window and pending batch; nothing else
/// touches them. Construct it with [`new`](Self::new) (or
/// [`with_validator`](Self::with_validator)), take a [`PipeHandle`], then
/// drive it with [`run`](Self::run).
pub struct LivePipe<C, V = SchemaValidator> {
    config: PipeConfig,
    filter: GlobFilter,
    validator: V,
    tailer: Tailer,
    dedup: DedupWindow,
    batcher: Batcher,
    dispatcher: Dispatcher<C>,
    dlq: DeadLetterStore,
    handle: PipeHandle,
}

impl<C, V> std::fmt::Debug for LivePipe<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePipe")
            .field("watch_dir", &self.config.watch_dir)
            .field("state", &self.handle.state())
            .field("pending", &self.batcher.pending())
            .finish_non_exhaustive()
    }
}

impl<C: SignalConsumer> LivePipe<C> {
    /// Creates a pipe using the default [`SchemaValidator`].
    ///
    /// # Errors
    ///
    /// See [`with_validator`](Self::with_validator).
    pub fn new(config: PipeConfig, consumer: C) -> Result<Self, PipeError> {
        Self::with_validator(config, consumer, SchemaValidator)
    }
}

impl<C: SignalConsumer, V: SignalValidator> LivePipe<C, V> {
    /// Creates a pipe with a custom validator.
    ///
    /// Validates the configuration and creates the watch, state,
    /// dead-letter and log directories.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Config`] for an invalid configuration,
    /// [`PipeError::Watch`] for an unparsable `file_glob` and
    /// [`PipeError::Io`] if a directory cannot be created.
    pub fn with_validator(config: PipeConfig, consumer: C, validator: V) -> Result<Self, PipeError> {
        config.validate()?;
        let filter = GlobFilter::new(&[config.file_glob.as_str()])?;
        for dir in config.directories() {
            std::fs::create_dir_all(dir).map_err(|e| PipeError::io(dir, e))?;
        }

        let handle = PipeHandle::new();
        let dlq = DeadLetterStore::new(&config.dlq_dir);
        let dispatcher = Dispatcher::new(
            consumer,
            config.retry_max,
            config.retry_backoff(),
            dlq.clone(),
            EventLog::new(&config.log_dir),
            Arc::clone(&handle.stats),
        );

        Ok(Self {
            filter,
            validator,
            tailer: Tailer::new(&config.state_dir),
            dedup: DedupWindow::new(config.dedupe_window),
            batcher: Batcher::new(config.batch_max, config.batch_timeout()),
            dispatcher,
            dlq,
            handle,
            config,
        })
    }

    /// Returns a handle for stopping and observing the pipe.
    #[must_use]
    pub fn handle(&self) -> PipeHandle {
        self.handle.clone()
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Runs until [`PipeHandle::stop`] is called, then flushes the pending
    /// batch and returns the final statistics.
    ///
    /// Nothing that happens while running is fatal: bad lines, invalid
    /// records and failed dispatches are dead-lettered and logged.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Watch`] if the watch directory cannot be watched.
    /// A native backend that fails to start falls back to polling instead.
    pub async fn run(mut self) -> Result<StatsSnapshot, PipeError> {
        let cancel = self.handle.cancel.clone();
        if cancel.is_cancelled() {
            self.handle.set_state(PipeState::Stopped);
            return Ok(self.handle.stats());
        }

        let filter = self.filter.clone();
        let mut watcher = FileWatcher::new(&self.config.watch_dir, &self.config.watch, filter).await?;
        self.handle.mark_running();
        self.batcher.restart_clock();

        tracing::info!(
            watch_dir = %watcher.watch_path(),
            glob = %self.config.file_glob,
            backend = ?self.config.watch.backend,
            "Live pipe running"
        );

        let mut watcher_open = true;
        loop {
            let event = if watcher_open {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    received = tokio::time::timeout(LOOP_TICK, watcher.recv()) => match received {
                        Ok(Some(event)) => Some(event),
                        Ok(None) => {
                            tracing::error!("Watcher stopped unexpectedly, no further file events");
                            watcher_open = false;
                            None
                        }
                        Err(_elapsed) => None,
                    },
                }
            } else {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.config.watch.poll_interval()) => None,
                }
            };

            if let Some(event) = event {
                self.handle_event(event).await;
            }
            if let Some(batch) = self.batcher.take_if_due(Instant::now()) {
                self.flush(batch).await;
            }
        }

        self.handle.set_state(PipeState::Stopping);
        tracing::info!(pending = self.batcher.pending(), "Stop requested, flushing");
        if let Some(batch) = self.batcher.take_pending() {
            self.flush(batch).await;
        }

        if let Err(e) = watcher.shutdown().await {
            tracing::warn!(error = %e, "Watcher did not shut down cleanly");
        }

        self.handle.set_state(PipeState::Stopped);
        let stats = self.handle.stats();
        tracing::info!(
            admitted = stats.admitted,
            batches = stats.batches_dispatched,
            quarantined = stats.batches_quarantined,
            "Live pipe stopped"
        );
        Ok(stats)
    }

    async fn handle_event(&mut self, event: WatchEvent) {
        tracing::debug!(path = %event.path, kind = %event.kind, "File event");

        if event.kind.is_deletion() {
            self.tailer.forget(&event.path);
            return;
        }

        tokio::time::sleep(self.config.debounce()).await;

        let stats = Arc::clone(&self.handle.stats);
        let records = self.tailer.tail(&event.path, &self.dlq, &stats);
        for raw in records {
            let signal = match self.validator.validate(&raw) {
                Ok(signal) => signal,
                Err(e) => {
                    stats.increment_invalid();
                    tracing::debug!(path = %event.path, error = %e, "Invalid signal");
                    if let Err(write_err) = self.dlq.invalid_record(&e.to_string(), &raw) {
                        tracing::error!(error = %write_err, "Failed to dead-letter invalid signal");
                    }
                    continue;
                }
            };

            if !self.dedup.admit(&signal.id) {
                stats.increment_duplicates();
                tracing::trace!(id = %signal.id, "Duplicate signal dropped");
                continue;
            }
            stats.increment_admitted();

            if let Some(batch) = self.batcher.push(signal) {
                self.flush(batch).await;
            }
        }
    }

    async fn flush(&mut self, batch: Batch) {
        // The dispatcher logs and accounts for every outcome itself.
        let _report = self.dispatcher.dispatch(batch).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchOutcome;
    use crate::error::DispatchError;
    use camino::{Utf8Path, Utf8PathBuf};
    use lp_core::{Signal, WatchBackend, WatchConfig};
    use serde_json::{Value, json};
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Records delivered ids per batch; optionally fails every dispatch.
    #[derive(Clone, Default)]
    struct Recorder {
        batches: Arc<Mutex<Vec<Vec<String>>>>,
        attempts: Arc<AtomicU32>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().clone()
        }

        fn ids(&self) -> Vec<String> {
            self.batches().concat()
        }
    }

    impl SignalConsumer for Recorder {
        async fn dispatch(&self, signals: &[Signal]) -> Result<DispatchOutcome, DispatchError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DispatchError::new("downstream unavailable"));
            }
            self.batches
                .lock()
                .push(signals.iter().map(|s| s.id.clone()).collect());
            Ok(DispatchOutcome::all_accepted(signals.len()))
        }
    }

    struct Fixture {
        _tmp: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let root = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
            Self { _tmp: tmp, root }
        }

        fn config(&self) -> PipeConfig {
            PipeConfig {
                watch_dir: self.root.join("inbox"),
                state_dir: self.root.join("state"),
                dlq_dir: self.root.join("dlq"),
                log_dir: self.root.join("logs"),
                debounce_ms: 10,
                batch_max: 10,
                batch_timeout_ms: 100,
                retry_max: 3,
                retry_backoff_ms: 10,
                watch: WatchConfig {
                    backend: WatchBackend::Poll,
                    poll_interval_ms: 20,
                },
                ..PipeConfig::default()
            }
        }

        fn append(&self, name: &str, lines: &[String]) {
            let mut text = lines.join("\n");
            text.push('\n');
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.root.join("inbox").join(name))
                .unwrap();
            file.write_all(text.as_bytes()).unwrap();
        }

        fn dlq_lines(&self, name: &str) -> Vec<Value> {
            std::fs::read_to_string(self.root.join("dlq").join(name))
                .unwrap_or_default()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    fn signal_line(id: &str) -> String {
        json!({
            "id": id,
            "timestamp": "2025-01-01T00:00:00Z",
            "symbol": "NQ",
            "side": "LONG",
            "confidence": 0.8,
            "entropy_score": 0.2,
            "regime_state": "trend_up",
        })
        .to_string()
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(std::time::Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn start<C: SignalConsumer + 'static>(
        config: PipeConfig,
        consumer: C,
    ) -> (PipeHandle, tokio::task::JoinHandle<Result<StatsSnapshot, PipeError>>) {
        let pipe = LivePipe::new(config, consumer).unwrap();
        let handle = pipe.handle();
        (handle, tokio::spawn(pipe.run()))
    }

    async fn stop(
        handle: &PipeHandle,
        task: tokio::task::JoinHandle<Result<StatsSnapshot, PipeError>>,
    ) -> StatsSnapshot {
        handle.stop();
        let stats = task.await.unwrap().unwrap();
        assert_eq!(handle.state(), PipeState::Stopped);
        stats
    }

    #[tokio::test]
    async fn test_new_creates_directories() {
        let fx = Fixture::new();
        let pipe = LivePipe::new(fx.config(), Recorder::default()).unwrap();

        for dir in ["inbox", "state", "dlq", "logs"] {
            assert!(fx.root.join(dir).is_dir(), "{dir} missing");
        }
        assert_eq!(pipe.handle().state(), PipeState::Created);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let fx = Fixture::new();
        let config = PipeConfig {
            batch_max: 0,
            ..fx.config()
        };
        let err = LivePipe::new(config, Recorder::default()).unwrap_err();
        assert!(matches!(err, PipeError::Config(_)));
    }

    #[tokio::test]
    async fn test_stop_before_run_returns_immediately() {
        let fx = Fixture::new();
        let pipe = LivePipe::new(fx.config(), Recorder::default()).unwrap();
        let handle = pipe.handle();

        handle.stop();
        assert_eq!(handle.state(), PipeState::Stopping);
        pipe.run().await.unwrap();
        assert_eq!(handle.state(), PipeState::Stopped);
    }

    #[tokio::test]
    async fn test_delivers_appended_signal() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        wait_until(|| handle.state() == PipeState::Running).await;
        fx.append("signals.ndjson", &[signal_line("sig-001")]);
        wait_until(|| !recorder.ids().is_empty()).await;

        let stats = stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["sig-001"]);
        assert_eq!(stats.admitted, 1);
        assert_eq!(stats.batches_dispatched, 1);

        let log = std::fs::read_to_string(fx.root.join("logs").join("live_pipe.log.jsonl")).unwrap();
        assert!(log.contains("\"kind\":\"batch_dispatch\""));
    }

    #[tokio::test]
    async fn test_ignores_files_outside_glob() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        fx.append("notes.txt", &[signal_line("ignored")]);
        fx.append("signals.ndjson", &[signal_line("kept")]);
        wait_until(|| !recorder.ids().is_empty()).await;

        stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["kept"]);
    }

    #[tokio::test]
    async fn test_malformed_line_is_isolated() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        fx.append(
            "signals.ndjson",
            &["{not json".to_owned(), signal_line("a"), signal_line("b")],
        );
        wait_until(|| recorder.ids().len() == 2).await;

        let stats = stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["a", "b"]);
        assert_eq!(stats.malformed_lines, 1);

        let bad = fx.dlq_lines("signals.bad.ndjson");
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0]["line"], "{not json");
    }

    #[tokio::test]
    async fn test_invalid_record_is_dead_lettered() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        let mut invalid: Value = serde_json::from_str(&signal_line("bad")).unwrap();
        invalid["confidence"] = json!(7.5);
        fx.append("signals.ndjson", &[invalid.to_string(), signal_line("good")]);
        wait_until(|| !recorder.ids().is_empty()).await;

        let stats = stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["good"]);
        assert_eq!(stats.invalid_records, 1);

        let entries = fx.dlq_lines("invalid_signal.ndjson");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["obj"]["id"], "bad");
        assert!(entries[0]["error"].as_str().unwrap().contains("confidence"));
    }

    #[tokio::test]
    async fn test_duplicates_inside_window_are_dropped() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        fx.append(
            "signals.ndjson",
            &[signal_line("a"), signal_line("a"), signal_line("b")],
        );
        wait_until(|| recorder.ids().len() == 2).await;
        fx.append("other.ndjson", &[signal_line("b")]);
        wait_until(|| handle.stats().duplicates == 2).await;

        stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_batch_max_triggers_immediate_flush() {
        let fx = Fixture::new();
        let config = PipeConfig {
            batch_max: 3,
            batch_timeout_ms: 60_000,
            ..fx.config()
        };
        let recorder = Recorder::default();
        let (handle, task) = start(config, recorder.clone());

        fx.append(
            "signals.ndjson",
            &[signal_line("a"), signal_line("b"), signal_line("c"), signal_line("d")],
        );
        wait_until(|| !recorder.batches().is_empty()).await;
        assert_eq!(recorder.batches(), [vec!["a", "b", "c"]]);

        // The remainder only goes out with the final flush
        stop(&handle, task).await;
        assert_eq!(recorder.batches().len(), 2);
        assert_eq!(recorder.batches()[1], ["d"]);
    }

    #[tokio::test]
    async fn test_timeout_triggers_flush_of_partial_batch() {
        let fx = Fixture::new();
        let config = PipeConfig {
            batch_max: 3,
            batch_timeout_ms: 300,
            ..fx.config()
        };
        let recorder = Recorder::default();
        let (handle, task) = start(config, recorder.clone());

        fx.append("signals.ndjson", &[signal_line("solo")]);
        wait_until(|| !recorder.batches().is_empty()).await;

        assert_eq!(handle.state(), PipeState::Running);
        assert_eq!(recorder.batches(), [vec!["solo"]]);
        stop(&handle, task).await;
    }

    #[tokio::test]
    async fn test_failing_consumer_quarantines_batch() {
        let fx = Fixture::new();
        let recorder = Recorder::failing();
        let (handle, task) = start(fx.config(), recorder.clone());

        fx.append("signals.ndjson", &[signal_line("a"), signal_line("b")]);
        wait_until(|| handle.stats().batches_quarantined == 1).await;

        let stats = stop(&handle, task).await;
        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(stats.dispatch_failures, 3);

        let quarantined: Vec<_> = std::fs::read_dir(fx.root.join("dlq"))
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("dispatch_fail_batch_"))
            .collect();
        assert_eq!(quarantined.len(), 1);

        let records = fx.dlq_lines(&quarantined[0]);
        let ids: Vec<_> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_clean_shutdown_flushes_pending_batch() {
        let fx = Fixture::new();
        let config = PipeConfig {
            batch_max: 100,
            batch_timeout_ms: 60_000,
            ..fx.config()
        };
        let recorder = Recorder::default();
        let (handle, task) = start(config, recorder.clone());

        fx.append("signals.ndjson", &[signal_line("a"), signal_line("b")]);
        wait_until(|| handle.stats().admitted == 2).await;
        assert!(recorder.batches().is_empty());

        stop(&handle, task).await;
        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.batches(), [vec!["a", "b"]]);
    }

    #[tokio::test]
    async fn test_restart_resumes_from_checkpoint() {
        let fx = Fixture::new();

        let first = Recorder::default();
        let (handle, task) = start(fx.config(), first.clone());
        fx.append("signals.ndjson", &[signal_line("a"), signal_line("b")]);
        wait_until(|| first.ids().len() == 2).await;
        stop(&handle, task).await;

        // Written while the pipe is down
        fx.append("signals.ndjson", &[signal_line("c")]);

        let second = Recorder::default();
        let (handle, task) = start(fx.config(), second.clone());
        wait_until(|| !second.ids().is_empty()).await;
        fx.append("signals.ndjson", &[signal_line("d")]);
        wait_until(|| second.ids().len() == 2).await;

        stop(&handle, task).await;
        assert_eq!(second.ids(), ["c", "d"]);
    }

    #[tokio::test]
    async fn test_deleted_file_is_forgotten_and_recreated_file_reread() {
        let fx = Fixture::new();
        let recorder = Recorder::default();
        let (handle, task) = start(fx.config(), recorder.clone());

        fx.append("signals.ndjson", &[signal_line("a")]);
        wait_until(|| recorder.ids().len() == 1).await;

        std::fs::remove_file(fx.root.join("inbox").join("signals.ndjson")).unwrap();
        // Long enough for the poller to report the deletion
        tokio::time::sleep(Duration::from_millis(200)).await;

        fx.append("signals.ndjson", &[signal_line("b"), signal_line("c")]);
        wait_until(|| recorder.ids().len() == 3).await;

        stop(&handle, task).await;
        assert_eq!(recorder.ids(), ["a", "b", "c"]);
    }
}
