//! The signal record ingested by the pipe.
//!
//! Signals arrive as one JSON object per line in the watched NDJSON files.
//! A signal is forwarded downstream only after it decodes and passes schema
//! validation; its `id` is the key used for duplicate suppression.

use serde::{Deserialize, Serialize};

use crate::hash::canonical_json_hash;

/// Directions accepted in [`Signal::side`].
pub const SIDES: [&str; 3] = ["LONG", "SHORT", "FLAT"];

/// A trading signal emitted by the upstream producer.
///
/// Unknown fields are rejected on deserialization, so a record carrying keys
/// the schema does not know about fails validation instead of silently
/// losing data.
///
/// # Examples
///
/// ```
/// use lp_core::Signal;
///
/// let signal: Signal = serde_json::from_str(
///     r#"{"id":"sig-001","timestamp":"2025-01-01T00:00:00Z","symbol":"NQ",
///         "side":"LONG","confidence":0.8,"entropy_score":0.2,
///         "regime_state":"trend_up"}"#,
/// ).unwrap();
/// assert_eq!(signal.id, "sig-001");
/// assert!(signal.features.is_empty());
/// assert!(signal.hash.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signal {
    /// Unique identifier, used as the deduplication key.
    pub id: String,

    /// Emission time as an RFC 3339 date-time string.
    pub timestamp: String,

    /// Instrument symbol.
    pub symbol: String,

    /// Direction: one of [`SIDES`].
    pub side: String,

    /// Producer confidence in `[0, 1]`.
    pub confidence: f64,

    /// Entropy classification score in `[0, 1]`.
    pub entropy_score: f64,

    /// Market regime label reported by the producer.
    pub regime_state: String,

    /// Free-form feature map.
    #[serde(default)]
    pub features: serde_json::Map<String, serde_json::Value>,

    /// Content hash in `sha256:<hex>` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Identifier of the memory capsule the signal belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capsule_id: Option<String>,
}

impl Signal {
    /// Computes the canonical content hash of this signal.
    ///
    /// The `hash` field itself is excluded, so the result is the value
    /// [`with_hash`](Self::with_hash) stores.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lp_core::Signal;
    /// # let signal: Signal = serde_json::from_str(
    /// #     r#"{"id":"a","timestamp":"2025-01-01T00:00:00Z","symbol":"ES",
    /// #         "side":"SHORT","confidence":0.5,"entropy_score":0.1,
    /// #         "regime_state":"range"}"#).unwrap();
    /// let hashed = signal.clone().with_hash();
    /// assert_eq!(hashed.hash.as_deref(), Some(signal.canonical_hash().as_str()));
    /// assert_eq!(hashed.canonical_hash(), signal.canonical_hash());
    /// ```
    #[must_use]
    pub fn canonical_hash(&self) -> String {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("hash");
        }
        canonical_json_hash(&value)
    }

    /// Returns the signal with its `hash` field set to the canonical hash.
    #[must_use]
    pub fn with_hash(mut self) -> Self {
        self.hash = Some(self.canonical_hash());
        self
    }
}
