//! The validator boundary between decoded JSON and typed signals.
//!
//! The pipe only relies on the pass/fail contract of [`SignalValidator`]:
//! a rejected value is dead-lettered together with the error and dropped.
//! [`SchemaValidator`] is the rule set used by default.

use serde::Deserialize;
use serde_json::Value;

use lp_core::{SIDES, Signal, ValidationError};

/// Turns a decoded JSON value into a [`Signal`] or rejects it.
pub trait SignalValidator: Send + Sync {
    /// Validates one decoded record.
    ///
    /// # Errors
    ///
    /// Returns the reason the record is not a valid signal.
    fn validate(&self, raw: &Value) -> Result<Signal, ValidationError>;
}

impl<F> SignalValidator for F
where
    F: Fn(&Value) -> Result<Signal, ValidationError> + Send + Sync,
{
    fn validate(&self, raw: &Value) -> Result<Signal, ValidationError> {
        self(raw)
    }
}

/// The default signal schema.
///
/// A valid record is a JSON object holding exactly the [`Signal`] fields
/// with the right types, where:
///
/// - `id`, `symbol` and `regime_state` are non-empty
/// - `timestamp` is an RFC 3339 date-time
/// - `side` is one of [`SIDES`]
/// - `confidence` and `entropy_score` are finite and within `[0, 1]`
///
/// # Examples
///
/// ```
/// use lp_pipe::{SchemaValidator, SignalValidator};
/// use serde_json::json;
///
/// let validator = SchemaValidator;
/// let ok = json!({
///     "id": "sig-1", "timestamp": "2025-01-01T09:30:00Z", "symbol": "NQ",
///     "side": "LONG", "confidence": 0.7, "entropy_score": 0.3,
///     "regime_state": "trend_up",
/// });
/// assert!(validator.validate(&ok).is_ok());
///
/// let mut bad = ok.clone();
/// bad["side"] = json!("UP");
/// assert!(validator.validate(&bad).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: 0.0,
                max: 1.0,
            })
        }
    }
}

impl SignalValidator for SchemaValidator {
    fn validate(&self, raw: &Value) -> Result<Signal, ValidationError> {
        let kind = match raw {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("a boolean"),
            Value::Number(_) => Some("a number"),
            Value::String(_) => Some("a string"),
            Value::Array(_) => Some("an array"),
        };
        if let Some(kind) = kind {
            return Err(ValidationError::NotAnObject(kind));
        }

        let signal = Signal::deserialize(raw)?;

        for (field, value) in [
            ("id", &signal.id),
            ("symbol", &signal.symbol),
            ("regime_state", &signal.regime_state),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(field));
            }
        }

        if chrono::DateTime::parse_from_rfc3339(&signal.timestamp).is_err() {
            return Err(ValidationError::InvalidTimestamp(signal.timestamp));
        }
        if !SIDES.contains(&signal.side.as_str()) {
            return Err(ValidationError::InvalidSide(signal.side));
        }
        Self::check_unit_interval("confidence", signal.confidence)?;
        Self::check_unit_interval("entropy_score", signal.entropy_score)?;

        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "id": "sig-001",
            "timestamp": "2025-01-01T00:00:00+00:00",
            "symbol": "NQ",
            "side": "SHORT",
            "confidence": 1.0,
            "entropy_score": 0.0,
            "regime_state": "range",
            "features": {"atr": 12.5},
            "capsule_id": "cap-7",
        })
    }

    #[test]
    fn test_accepts_valid_record() {
        let signal = SchemaValidator.validate(&valid()).unwrap();
        assert_eq!(signal.side, "SHORT");
        assert_eq!(signal.features["atr"], 12.5);
        assert_eq!(signal.capsule_id.as_deref(), Some("cap-7"));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = SchemaValidator.validate(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject("an array")));
    }

    #[test]
    fn test_rejects_unknown_and_missing_fields() {
        let mut extra = valid();
        extra["venue"] = json!("cme");
        assert!(matches!(
            SchemaValidator.validate(&extra),
            Err(ValidationError::Shape(_))
        ));

        let mut missing = valid();
        missing.as_object_mut().unwrap().remove("confidence");
        assert!(matches!(
            SchemaValidator.validate(&missing),
            Err(ValidationError::Shape(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_types() {
        let mut raw = valid();
        raw["confidence"] = json!("high");
        assert!(SchemaValidator.validate(&raw).is_err());
    }

    #[test]
    fn test_rejects_empty_id() {
        let mut raw = valid();
        raw["id"] = json!(" ");
        let err = SchemaValidator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        let mut raw = valid();
        raw["timestamp"] = json!("yesterday");
        let err = SchemaValidator.validate(&raw).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_rejects_unknown_side() {
        let mut raw = valid();
        raw["side"] = json!("long");
        let err = SchemaValidator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), Some("side"));
    }

    #[test]
    fn test_rejects_out_of_range_scores() {
        let mut raw = valid();
        raw["confidence"] = json!(1.01);
        let err = SchemaValidator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), Some("confidence"));

        let mut raw = valid();
        raw["entropy_score"] = json!(-0.1);
        let err = SchemaValidator.validate(&raw).unwrap_err();
        assert_eq!(err.field(), Some("entropy_score"));
    }

    #[test]
    fn test_closure_validator() {
        let accept_nq = |raw: &Value| -> Result<Signal, ValidationError> {
            let signal = SchemaValidator.validate(raw)?;
            if signal.symbol == "NQ" {
                Ok(signal)
            } else {
                Err(ValidationError::EmptyField("symbol"))
            }
        };
        assert!(accept_nq.validate(&valid()).is_ok());
    }
}
