//! Operator-facing NDJSON log of dispatch outcomes.
//!
//! Each line carries an RFC 3339 `ts`, a `kind` and the event payload. The
//! log is diagnostic only; nothing reads it back.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::dlq::append_ndjson;
use crate::error::PipeError;

/// File name of the event log inside `log_dir`.
pub const EVENT_LOG_FILE: &str = "live_pipe.log.jsonl";

/// An entry in the event log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipeEvent<'a> {
    /// One dispatch attempt failed.
    DispatchError {
        /// Batch being dispatched.
        batch_id: &'a str,
        /// Error reported by the consumer.
        error: &'a str,
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Records in the batch.
        size: usize,
    },
    /// The consumer took a batch.
    BatchDispatch {
        /// Batch that was dispatched.
        batch_id: &'a str,
        /// Records in the batch.
        size: usize,
        /// Attempts it took, including the successful one.
        attempts: u32,
        /// Records the consumer accepted.
        accepted: u64,
        /// Records the consumer rejected.
        rejected: u64,
        /// Rejection counts by reason.
        reasons: &'a BTreeMap<String, u64>,
    },
    /// A batch exhausted its retries and was written to the dead-letter store.
    BatchQuarantine {
        /// Batch that was quarantined.
        batch_id: &'a str,
        /// Records in the batch.
        size: usize,
        /// Attempts made.
        attempts: u32,
        /// Dead-letter file holding the records.
        path: &'a Utf8Path,
    },
}

#[derive(Serialize)]
struct Entry<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a PipeEvent<'a>,
}

/// Appends [`PipeEvent`]s to `log_dir/live_pipe.log.jsonl`.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: Utf8PathBuf,
}

impl EventLog {
    /// Creates a log inside `log_dir`, which must exist.
    #[must_use]
    pub fn new(log_dir: &Utf8Path) -> Self {
        Self {
            path: log_dir.join(EVENT_LOG_FILE),
        }
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends one event stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the log cannot be written.
    pub fn record(&self, event: &PipeEvent<'_>) -> Result<(), PipeError> {
        let entry = Entry {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        };
        append_ndjson(&self.path, [&entry])
    }
}
