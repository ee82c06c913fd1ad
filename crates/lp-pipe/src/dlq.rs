//! Dead-letter store for items the pipe cannot deliver.
//!
//! Every destination is an append-only NDJSON file under `dlq_dir`:
//!
//! | cause | file | one line per |
//! |-------|------|--------------|
//! | line is not JSON | `<stem>.bad.ndjson` | `{"error", "line"}` |
//! | record fails validation | `invalid_signal.ndjson` | `{"error", "obj"}` |
//! | batch exhausted its retries | `dispatch_fail_<batch_id>.ndjson` | record |

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;

use lp_core::Signal;

use crate::error::PipeError;

/// File receiving records rejected by the validator.
pub const INVALID_SIGNAL_FILE: &str = "invalid_signal.ndjson";

#[derive(Serialize)]
struct BadLine<'a> {
    error: &'a str,
    line: &'a str,
}

#[derive(Serialize)]
struct InvalidRecord<'a> {
    error: &'a str,
    obj: &'a Value,
}

/// Appends one serialized line per item to `path`, creating the file if
/// needed.
pub(crate) fn append_ndjson<'a, T, I>(path: &Utf8Path, items: I) -> Result<(), PipeError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipeError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n").map_err(|e| PipeError::io(path, e))?;
    }
    writer.flush().map_err(|e| PipeError::io(path, e))
}

/// Writes dead-letter entries under a single directory.
///
/// # Examples
///
/// ```
/// use lp_pipe::DeadLetterStore;
/// use camino::Utf8Path;
///
/// # fn main() -> Result<(), lp_pipe::PipeError> {
/// # let tmp = tempfile::TempDir::new().unwrap();
/// # let dir = Utf8Path::from_path(tmp.path()).unwrap();
/// let dlq = DeadLetterStore::new(dir);
/// let written = dlq.malformed_line(
///     Utf8Path::new("/inbox/signals.ndjson"),
///     "expected value at line 1 column 1",
///     "{oops",
/// )?;
/// assert_eq!(written.file_name(), Some("signals.bad.ndjson"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeadLetterStore {
    dir: Utf8PathBuf,
}

impl DeadLetterStore {
    /// Creates a store writing into `dir`, which must exist.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the dead-letter directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Records a line of `source` that is not valid JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the dead-letter file cannot be written.
    pub fn malformed_line(
        &self,
        source: &Utf8Path,
        error: &str,
        line: &str,
    ) -> Result<Utf8PathBuf, PipeError> {
        let stem = source.file_stem().unwrap_or("unknown");
        let path = self.dir.join(format!("{stem}.bad.ndjson"));
        append_ndjson(&path, [&BadLine { error, line }])?;
        Ok(path)
    }

    /// Records a decoded object that failed validation.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the dead-letter file cannot be written.
    pub fn invalid_record(&self, error: &str, obj: &Value) -> Result<Utf8PathBuf, PipeError> {
        let path = self.dir.join(INVALID_SIGNAL_FILE);
        append_ndjson(&path, [&InvalidRecord { error, obj }])?;
        Ok(path)
    }

    /// Writes every record of a batch that exhausted its retries.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the dead-letter file cannot be written.
    pub fn quarantine(&self, batch_id: &str, signals: &[Signal]) -> Result<Utf8PathBuf, PipeError> {
        let path = self.dir.join(format!("dispatch_fail_{batch_id}.ndjson"));
        append_ndjson(&path, signals)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn read_lines(path: &Utf8Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn signal(id: &str) -> Signal {
        serde_json::from_value(json!({
            "id": id,
            "timestamp": "2025-01-01T00:00:00Z",
            "symbol": "NQ",
            "side": "LONG",
            "confidence": 0.8,
            "entropy_score": 0.2,
            "regime_state": "trend_up",
        }))
        .unwrap()
    }

    #[test]
    fn test_malformed_lines_append() {
        let tmp = TempDir::new().unwrap();
        let dlq = DeadLetterStore::new(Utf8Path::from_path(tmp.path()).unwrap());
        let source = Utf8Path::new("/inbox/day.2025.ndjson");

        dlq.malformed_line(source, "bad one", "{").unwrap();
        let path = dlq.malformed_line(source, "bad two", "}").unwrap();

        assert_eq!(path.file_name(), Some("day.2025.bad.ndjson"));
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], json!({"error": "bad one", "line": "{"}));
        assert_eq!(lines[1]["line"], "}");
    }

    #[test]
    fn test_invalid_record_keeps_object() {
        let tmp = TempDir::new().unwrap();
        let dlq = DeadLetterStore::new(Utf8Path::from_path(tmp.path()).unwrap());

        let path = dlq.invalid_record("missing field `id`", &json!({"symbol": "ES"})).unwrap();

        assert_eq!(path.file_name(), Some(INVALID_SIGNAL_FILE));
        let lines = read_lines(&path);
        assert_eq!(lines[0]["obj"], json!({"symbol": "ES"}));
        assert_eq!(lines[0]["error"], "missing field `id`");
    }

    #[test]
    fn test_quarantine_writes_every_record() {
        let tmp = TempDir::new().unwrap();
        let dlq = DeadLetterStore::new(Utf8Path::from_path(tmp.path()).unwrap());

        let batch = [signal("a"), signal("b"), signal("c")];
        let path = dlq.quarantine("batch_1_0", &batch).unwrap();

        assert_eq!(path.file_name(), Some("dispatch_fail_batch_1_0.ndjson"));
        let ids: Vec<_> = read_lines(&path)
            .into_iter()
            .map(|v| v["id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let dlq = DeadLetterStore::new(Utf8Path::from_path(tmp.path()).unwrap().join("nope"));
        let err = dlq.invalid_record("x", &json!(1)).unwrap_err();
        assert!(err.is_recoverable());
    }
}
