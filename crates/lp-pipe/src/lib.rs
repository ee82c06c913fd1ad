//! Live NDJSON signal ingestion.
//!
//! This crate watches a drop directory for newline-delimited JSON signal
//! files, reads each file incrementally from a persisted offset, and hands
//! validated, deduplicated signals to a downstream consumer in bounded
//! batches. Nothing that arrives in a file can stop the pipe: malformed
//! lines, invalid records and batches the consumer keeps refusing all end up
//! in a dead-letter directory.
//!
//! # Overview
//!
//! The main entry point is [`LivePipe`], which combines:
//!
//! - [`Tailer`]: Incremental line reading with per-file [`OffsetStore`]
//!   checkpoints, so a restart resumes where the previous run stopped
//! - [`SignalValidator`]: Schema and range checks producing typed signals
//! - [`DedupWindow`]: Bounded FIFO window of recently admitted ids
//! - [`Batcher`]: Size- and time-triggered batch assembly
//! - [`Dispatcher`]: Fixed-backoff retry, then quarantine to the
//!   [`DeadLetterStore`], with every outcome recorded in the [`EventLog`]
//! - [`PipeStats`]: Atomic counters readable through a [`PipeHandle`]
//!
//! # Example
//!
//! ```no_run
//! use lp_core::{PipeConfig, Signal};
//! use lp_pipe::{DispatchError, HandleStatus, HandlerAdapter, LivePipe};
//!
//! # async fn example() -> Result<(), lp_pipe::PipeError> {
//! let consumer = HandlerAdapter::new(|signal: &Signal| -> Result<HandleStatus, DispatchError> {
//!     println!("{} {} @ {}", signal.symbol, signal.side, signal.confidence);
//!     Ok(HandleStatus::Accepted)
//! });
//!
//! let pipe = LivePipe::new(PipeConfig::default(), consumer)?;
//! let handle = pipe.handle();
//!
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop();
//! });
//!
//! let stats = pipe.run().await?;
//! println!("delivered {} of {} admitted", stats.records_accepted, stats.admitted);
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery Guarantees
//!
//! Offsets are committed as soon as lines are read, before their batch is
//! dispatched. A crash can therefore lose the pending batch, but a restart
//! never re-reads committed lines. Within one run, an id is delivered at
//! most once while it stays inside the dedup window.
//!
//! # On-disk Layout
//!
//! ```text
//! state_dir/sha256_<hex>.json          {"path": ..., "offset": ...}
//! dlq_dir/<stem>.bad.ndjson            {"error": ..., "line": ...}
//! dlq_dir/invalid_signal.ndjson        {"error": ..., "obj": ...}
//! dlq_dir/dispatch_fail_<batch>.ndjson one signal per line
//! log_dir/live_pipe.log.jsonl          {"ts": ..., "kind": ..., ...}
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod adapter;
mod batch;
mod dedup;
mod dispatch;
mod dlq;
mod error;
mod event_log;
mod offsets;
mod pipe;
mod stats;
mod tailer;
mod validate;

pub use adapter::{HANDLER_ERROR_REASON, HandleStatus, HandlerAdapter, SignalHandler, UNKNOWN_REASON};
pub use batch::{Batch, Batcher};
pub use dedup::DedupWindow;
pub use dispatch::{DispatchOutcome, DispatchReport, Dispatcher, SignalConsumer};
pub use dlq::{DeadLetterStore, INVALID_SIGNAL_FILE};
pub use error::{DispatchError, PipeError};
pub use event_log::{EVENT_LOG_FILE, EventLog, PipeEvent};
pub use offsets::{Checkpoint, OffsetStore};
pub use pipe::{LivePipe, PipeHandle, PipeState};
pub use stats::{PipeStats, StatsSnapshot};
pub use tailer::Tailer;
pub use validate::{SchemaValidator, SignalValidator};
