//! Pipe statistics with atomic counters.
//!
//! This module provides [`PipeStats`] for tracking ingestion progress and
//! [`StatsSnapshot`] for point-in-time statistics views.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. The main loop is the only writer; a [`PipeHandle`](crate::PipeHandle)
//! may read them from any task.
//!
//! # Examples
//!
//! ```
//! use lp_pipe::PipeStats;
//!
//! let stats = PipeStats::new();
//! stats.add_lines_read(3);
//! stats.increment_malformed();
//!
//! let snapshot = stats.snapshot();
//! println!("Read {} lines, {} malformed", snapshot.lines_read, snapshot.malformed_lines);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for pipe statistics.
#[derive(Debug, Default)]
pub struct PipeStats {
    /// Non-blank lines read from watched files.
    lines_read: AtomicU64,
    /// Lines that were not valid JSON.
    malformed_lines: AtomicU64,
    /// Decoded records rejected by the validator.
    invalid_records: AtomicU64,
    /// Records dropped by the dedup window.
    duplicates: AtomicU64,
    /// Records admitted into a batch.
    admitted: AtomicU64,
    /// Batches the consumer took successfully.
    batches_dispatched: AtomicU64,
    /// Batches written to the dead-letter store after exhausting retries.
    batches_quarantined: AtomicU64,
    /// Failed dispatch attempts, counting every retry.
    dispatch_failures: AtomicU64,
    /// Records the consumer reported as accepted.
    records_accepted: AtomicU64,
    /// Records the consumer reported as rejected.
    records_rejected: AtomicU64,
    /// Records inside quarantined batches.
    records_quarantined: AtomicU64,
}

impl PipeStats {
    /// Creates a new [`PipeStats`] with all counters at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use lp_pipe::PipeStats;
    ///
    /// let stats = PipeStats::new();
    /// assert_eq!(stats.snapshot().lines_read, 0);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to the lines-read counter.
    #[inline]
    pub fn add_lines_read(&self, n: u64) {
        self.lines_read.fetch_add(n, Ordering::Relaxed);
    }

    /// Increments the malformed-line counter.
    #[inline]
    pub fn increment_malformed(&self) {
        self.malformed_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the invalid-record counter.
    #[inline]
    pub fn increment_invalid(&self) {
        self.invalid_records.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the duplicate counter.
    #[inline]
    pub fn increment_duplicates(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the admitted-record counter.
    #[inline]
    pub fn increment_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed-attempt counter.
    #[inline]
    pub fn increment_dispatch_failures(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful dispatch and the consumer's per-record counts.
    #[inline]
    pub fn record_dispatched(&self, accepted: u64, rejected: u64) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.records_accepted.fetch_add(accepted, Ordering::Relaxed);
        self.records_rejected.fetch_add(rejected, Ordering::Relaxed);
    }

    /// Records a quarantined batch of `size` records.
    #[inline]
    pub fn record_quarantined(&self, size: u64) {
        self.batches_quarantined.fetch_add(1, Ordering::Relaxed);
        self.records_quarantined.fetch_add(size, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all statistics.
    ///
    /// # Examples
    ///
    /// ```
    /// use lp_pipe::PipeStats;
    ///
    /// let stats = PipeStats::new();
    /// stats.increment_admitted();
    /// stats.record_dispatched(1, 0);
    ///
    /// let snap = stats.snapshot();
    /// assert_eq!(snap.admitted, 1);
    /// assert_eq!(snap.batches_dispatched, 1);
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            invalid_records: self.invalid_records.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            batches_quarantined: self.batches_quarantined.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_quarantined: self.records_quarantined.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of pipe statistics.
///
/// This struct contains copied values from [`PipeStats`] and is safe to
/// store, serialize, and send between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Non-blank lines read from watched files.
    pub lines_read: u64,
    /// Lines that were not valid JSON.
    pub malformed_lines: u64,
    /// Decoded records rejected by the validator.
    pub invalid_records: u64,
    /// Records dropped by the dedup window.
    pub duplicates: u64,
    /// Records admitted into a batch.
    pub admitted: u64,
    /// Batches the consumer took successfully.
    pub batches_dispatched: u64,
    /// Batches quarantined after exhausting retries.
    pub batches_quarantined: u64,
    /// Failed dispatch attempts, counting every retry.
    pub dispatch_failures: u64,
    /// Records the consumer reported as accepted.
    pub records_accepted: u64,
    /// Records the consumer reported as rejected.
    pub records_rejected: u64,
    /// Records inside quarantined batches.
    pub records_quarantined: u64,
}

impl StatsSnapshot {
    /// Returns the number of items that ended up in the dead-letter store:
    /// malformed lines, invalid records and quarantined records.
    ///
    /// # Examples
    ///
    /// ```
    /// use lp_pipe::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot {
    ///     malformed_lines: 1,
    ///     invalid_records: 2,
    ///     records_quarantined: 5,
    ///     ..Default::default()
    /// };
    /// assert_eq!(snap.dead_lettered(), 8);
    /// ```
    #[inline]
    #[must_use]
    pub const fn dead_lettered(&self) -> u64 {
        self.malformed_lines + self.invalid_records + self.records_quarantined
    }

    /// Returns the share of delivered records the consumer accepted, as a
    /// percentage. Returns 100.0 if nothing was delivered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn acceptance_rate(&self) -> f64 {
        let delivered = self.records_accepted + self.records_rejected;
        if delivered == 0 {
            return 100.0;
        }

        (self.records_accepted as f64 / delivered as f64) * 100.0
    }
}
