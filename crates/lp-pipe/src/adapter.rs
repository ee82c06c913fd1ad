//! Adapter from a per-record handler to a batch [`SignalConsumer`].
//!
//! Many downstream systems take one signal at a time and answer with a
//! status. [`HandlerAdapter`] feeds them a batch record by record and turns
//! the answers into a [`DispatchOutcome`].

use lp_core::Signal;

use crate::dispatch::{DispatchOutcome, SignalConsumer};
use crate::error::DispatchError;

/// Reason recorded when a handler fails on a record.
pub const HANDLER_ERROR_REASON: &str = "handler_error";

/// Reason recorded when a handler rejects a record without saying why.
pub const UNKNOWN_REASON: &str = "unknown";

/// A handler's verdict on one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleStatus {
    /// The signal was taken.
    Accepted,
    /// The signal was refused, optionally with a reason tag.
    Rejected(Option<String>),
}

impl HandleStatus {
    /// A rejection with a reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(Some(reason.into()))
    }
}

/// Handles one signal at a time.
///
/// Closures of the right shape implement this trait.
pub trait SignalHandler: Send + Sync {
    /// Handles one signal.
    ///
    /// # Errors
    ///
    /// An error counts the record as rejected with reason
    /// [`HANDLER_ERROR_REASON`]; it does not fail the batch.
    fn handle_signal(&self, signal: &Signal) -> Result<HandleStatus, DispatchError>;
}

impl<F> SignalHandler for F
where
    F: Fn(&Signal) -> Result<HandleStatus, DispatchError> + Send + Sync,
{
    fn handle_signal(&self, signal: &Signal) -> Result<HandleStatus, DispatchError> {
        self(signal)
    }
}

/// Wraps a [`SignalHandler`] as a batch consumer.
///
/// The adapter itself never fails a batch, so batches delivered through it
/// are never retried.
///
/// # Examples
///
/// ```
/// use lp_pipe::{DispatchError, HandleStatus, HandlerAdapter, SignalConsumer};
/// use lp_core::Signal;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let adapter = HandlerAdapter::new(|signal: &Signal| -> Result<HandleStatus, DispatchError> {
///     Ok(if signal.confidence >= 0.5 {
///         HandleStatus::Accepted
///     } else {
///         HandleStatus::rejected("low_confidence")
///     })
/// });
///
/// let signal: Signal = serde_json::from_str(
///     r#"{"id":"a","timestamp":"2025-01-01T00:00:00Z","symbol":"NQ","side":"LONG",
///         "confidence":0.2,"entropy_score":0.4,"regime_state":"range"}"#,
/// ).unwrap();
/// let outcome = adapter.dispatch(&[signal]).await.unwrap();
/// assert_eq!(outcome.rejected, 1);
/// assert_eq!(outcome.reasons["low_confidence"], 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HandlerAdapter<H> {
    handler: H,
}

impl<H: SignalHandler> HandlerAdapter<H> {
    /// Wraps `handler`.
    #[must_use]
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Returns the wrapped handler.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    fn tally(&self, signals: &[Signal]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for signal in signals {
            match self.handler.handle_signal(signal) {
                Ok(HandleStatus::Accepted) => outcome.accept(),
                Ok(HandleStatus::Rejected(reason)) => {
                    outcome.reject(reason.unwrap_or_else(|| UNKNOWN_REASON.to_owned()));
                }
                Err(e) => {
                    tracing::debug!(id = %signal.id, error = %e, "Handler failed on signal");
                    outcome.reject(HANDLER_ERROR_REASON);
                }
            }
        }
        outcome
    }
}

impl<H: SignalHandler> SignalConsumer for HandlerAdapter<H> {
    async fn dispatch(&self, signals: &[Signal]) -> Result<DispatchOutcome, DispatchError> {
        Ok(self.tally(signals))
    }
}
