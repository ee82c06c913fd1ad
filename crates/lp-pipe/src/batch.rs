//! Batch assembly and the size/time flush policy.

use std::time::Duration;

use tokio::time::Instant;

use lp_core::Signal;

/// An ordered group of signals awaiting dispatch.
///
/// The id is assigned lazily by the dispatcher on the first attempt and then
/// stays fixed across retries.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    id: Option<String>,
    signals: Vec<Signal>,
}

impl Batch {
    /// Creates a batch without an id.
    #[must_use]
    pub const fn new(signals: Vec<Signal>) -> Self {
        Self { id: None, signals }
    }

    /// Returns the batch id, if one was assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the id, assigning it with `make_id` on first use.
    pub fn id_or_assign(&mut self, make_id: impl FnOnce() -> String) -> &str {
        self.id.get_or_insert_with(make_id)
    }

    /// Returns the signals in arrival order.
    #[must_use]
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Number of signals in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if the batch holds no signals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Consumes the batch, returning its signals.
    #[must_use]
    pub fn into_signals(self) -> Vec<Signal> {
        self.signals
    }
}

/// Accumulates signals and decides when to flush.
///
/// A flush happens as soon as `batch_max` signals are pending, or when a
/// check finds that `batch_timeout` has passed since the previous flush.
/// The clock restarts at every flush, not when the first signal of a batch
/// arrives.
///
/// # Examples
///
/// ```
/// use lp_pipe::Batcher;
/// use std::time::Duration;
///
/// let batcher = Batcher::new(256, Duration::from_secs(1));
/// assert_eq!(batcher.pending(), 0);
/// ```
#[derive(Debug)]
pub struct Batcher {
    max: usize,
    timeout: Duration,
    pending: Vec<Signal>,
    last_flush: Instant,
}

impl Batcher {
    /// Creates a batcher. A `max` of 0 is treated as 1.
    #[must_use]
    pub fn new(max: usize, timeout: Duration) -> Self {
        let max = max.max(1);
        Self {
            max,
            timeout,
            pending: Vec::with_capacity(max.min(1024)),
            last_flush: Instant::now(),
        }
    }

    /// Adds a signal, returning a full batch if this signal completed one.
    pub fn push(&mut self, signal: Signal) -> Option<Batch> {
        self.pending.push(signal);
        (self.pending.len() >= self.max).then(|| self.flush())
    }

    /// Returns the pending signals as a batch if the timeout has elapsed
    /// since the last flush and something is pending.
    pub fn take_if_due(&mut self, now: Instant) -> Option<Batch> {
        if self.pending.is_empty() || now.saturating_duration_since(self.last_flush) < self.timeout {
            return None;
        }
        Some(self.flush())
    }

    /// Restarts the timeout clock as if a flush had just happened.
    pub fn restart_clock(&mut self) {
        self.last_flush = Instant::now();
    }

    /// Returns whatever is pending, regardless of the timeout.
    pub fn take_pending(&mut self) -> Option<Batch> {
        (!self.pending.is_empty()).then(|| self.flush())
    }

    /// Number of signals waiting for a flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn flush(&mut self) -> Batch {
        self.last_flush = Instant::now();
        let capacity = self.max.min(1024);
        Batch::new(std::mem::replace(&mut self.pending, Vec::with_capacity(capacity)))
    }
}
