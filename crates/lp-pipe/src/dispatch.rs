//! Batch dispatch with fixed-backoff retry and quarantine.
//!
//! # Retry policy
//!
//! ```text
//! attempt 1 ──fail──► sleep(backoff) ──► attempt 2 ──fail──► ... attempt retry_max
//!     │                                      │                        │
//!    ok                                     ok                      fail
//!     ▼                                      ▼                        ▼
//! batch_dispatch                       batch_dispatch      dispatch_fail_<id>.ndjson
//! ```
//!
//! Only a batch-level [`DispatchError`] is retried. Per-record rejections
//! reported in a [`DispatchOutcome`] are counted and logged, never retried.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use lp_core::Signal;

use crate::batch::Batch;
use crate::dlq::DeadLetterStore;
use crate::error::DispatchError;
use crate::event_log::{EventLog, PipeEvent};
use crate::stats::PipeStats;

/// Per-record result of a successful dispatch, as reported by the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Records the consumer accepted.
    pub accepted: u64,
    /// Records the consumer rejected.
    pub rejected: u64,
    /// Rejection counts keyed by reason.
    pub reasons: BTreeMap<String, u64>,
}

impl DispatchOutcome {
    /// An outcome where all `n` records were accepted.
    #[must_use]
    pub fn all_accepted(n: usize) -> Self {
        Self {
            accepted: n as u64,
            ..Self::default()
        }
    }

    /// Counts one accepted record.
    pub fn accept(&mut self) {
        self.accepted += 1;
    }

    /// Counts one rejected record under `reason`.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.rejected += 1;
        *self.reasons.entry(reason.into()).or_default() += 1;
    }
}

/// The downstream consumer of validated batches.
///
/// Implementations can be written with `async fn`.
///
/// # Examples
///
/// ```
/// use lp_pipe::{DispatchError, DispatchOutcome, SignalConsumer};
/// use lp_core::Signal;
///
/// struct Sink;
///
/// impl SignalConsumer for Sink {
///     async fn dispatch(&self, signals: &[Signal]) -> Result<DispatchOutcome, DispatchError> {
///         Ok(DispatchOutcome::all_accepted(signals.len()))
///     }
/// }
/// ```
pub trait SignalConsumer: Send + Sync {
    /// Delivers one batch.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the batch as a whole could not be
    /// delivered; the dispatcher will retry it.
    fn dispatch(
        &self,
        signals: &[Signal],
    ) -> impl Future<Output = Result<DispatchOutcome, DispatchError>> + Send;
}

impl<C: SignalConsumer + ?Sized> SignalConsumer for Arc<C> {
    fn dispatch(
        &self,
        signals: &[Signal],
    ) -> impl Future<Output = Result<DispatchOutcome, DispatchError>> + Send {
        (**self).dispatch(signals)
    }
}

/// What became of a dispatched batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    /// The consumer took the batch.
    Delivered {
        /// Id assigned to the batch.
        batch_id: String,
        /// Attempts it took, including the successful one.
        attempts: u32,
        /// The consumer's per-record accounting.
        outcome: DispatchOutcome,
    },
    /// Every attempt failed and the batch was dead-lettered.
    Quarantined {
        /// Id assigned to the batch.
        batch_id: String,
        /// Attempts made.
        attempts: u32,
        /// Dead-letter file, or `None` if writing it failed too.
        path: Option<Utf8PathBuf>,
    },
}

impl DispatchReport {
    /// Returns the batch id.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        match self {
            Self::Delivered { batch_id, .. } | Self::Quarantined { batch_id, .. } => batch_id,
        }
    }

    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts, .. } | Self::Quarantined { attempts, .. } => *attempts,
        }
    }

    /// Returns `true` if the batch was delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Hands batches to a [`SignalConsumer`], retrying and quarantining.
#[derive(Debug)]
pub struct Dispatcher<C> {
    consumer: C,
    retry_max: u32,
    backoff: Duration,
    dlq: DeadLetterStore,
    log: EventLog,
    stats: Arc<PipeStats>,
    seq: u64,
}

impl<C: SignalConsumer> Dispatcher<C> {
    /// Creates a dispatcher. A `retry_max` of 0 is treated as 1.
    #[must_use]
    pub fn new(
        consumer: C,
        retry_max: u32,
        backoff: Duration,
        dlq: DeadLetterStore,
        log: EventLog,
        stats: Arc<PipeStats>,
    ) -> Self {
        Self {
            consumer,
            retry_max: retry_max.max(1),
            backoff,
            dlq,
            log,
            stats,
            seq: 0,
        }
    }

    /// Returns the wrapped consumer.
    #[must_use]
    pub const fn consumer(&self) -> &C {
        &self.consumer
    }

    fn next_batch_id(&mut self) -> String {
        let id = format!("batch_{}_{}", Utc::now().timestamp_millis(), self.seq);
        self.seq += 1;
        id
    }

    fn log_event(&self, event: &PipeEvent<'_>) {
        if let Err(e) = self.log.record(event) {
            tracing::warn!(error = %e, "Failed to write event log");
        }
    }

    /// Dispatches `batch`, retrying up to `retry_max` attempts with a fixed
    /// backoff, then quarantining it.
    ///
    /// Returns `None` for an empty batch, which is not dispatched.
    pub async fn dispatch(&mut self, mut batch: Batch) -> Option<DispatchReport> {
        if batch.is_empty() {
            return None;
        }
        let batch_id = batch.id_or_assign(|| self.next_batch_id()).to_owned();
        let size = batch.len();
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            match self.consumer.dispatch(batch.signals()).await {
                Ok(outcome) => {
                    self.stats.record_dispatched(outcome.accepted, outcome.rejected);
                    self.log_event(&PipeEvent::BatchDispatch {
                        batch_id: &batch_id,
                        size,
                        attempts: attempt,
                        accepted: outcome.accepted,
                        rejected: outcome.rejected,
                        reasons: &outcome.reasons,
                    });
                    tracing::info!(
                        batch_id = %batch_id,
                        size,
                        attempts = attempt,
                        accepted = outcome.accepted,
                        rejected = outcome.rejected,
                        "Batch dispatched"
                    );
                    return Some(DispatchReport::Delivered {
                        batch_id,
                        attempts: attempt,
                        outcome,
                    });
                }
                Err(err) => {
                    self.stats.increment_dispatch_failures();
                    self.log_event(&PipeEvent::DispatchError {
                        batch_id: &batch_id,
                        error: err.message(),
                        attempt,
                        size,
                    });
                    tracing::warn!(
                        batch_id = %batch_id,
                        attempt,
                        retry_max = self.retry_max,
                        error = %err,
                        "Dispatch attempt failed"
                    );

                    if attempt < self.retry_max {
                        tokio::time::sleep(self.backoff).await;
                        continue;
                    }
                    return Some(self.quarantine(batch_id, attempt, batch.signals()));
                }
            }
        }
    }

    fn quarantine(&self, batch_id: String, attempts: u32, signals: &[Signal]) -> DispatchReport {
        let path = match self.dlq.quarantine(&batch_id, signals) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Failed to quarantine batch, records lost");
                None
            }
        };
        self.stats.record_quarantined(signals.len() as u64);

        if let Some(path) = &path {
            self.log_event(&PipeEvent::BatchQuarantine {
                batch_id: &batch_id,
                size: signals.len(),
                attempts,
                path,
            });
        }
        tracing::error!(batch_id = %batch_id, attempts, size = signals.len(), "Batch quarantined");

        DispatchReport::Quarantined {
            batch_id,
            attempts,
            path,
        }
    }
}
