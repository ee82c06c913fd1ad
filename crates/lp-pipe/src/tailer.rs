//! Incremental reading of appended NDJSON lines.
//!
//! The tailer reads from the stored offset to the last complete line,
//! decodes each non-blank line as JSON and persists the new offset after
//! every pass, including passes that found nothing.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

use crate::dlq::DeadLetterStore;
use crate::offsets::OffsetStore;
use crate::stats::PipeStats;

/// Reads newly appended lines from watched files.
///
/// # Examples
///
/// ```
/// use lp_pipe::{DeadLetterStore, PipeStats, Tailer};
/// use camino::Utf8Path;
///
/// # let tmp = tempfile::TempDir::new().unwrap();
/// # let dir = Utf8Path::from_path(tmp.path()).unwrap();
/// let file = dir.join("signals.ndjson");
/// std::fs::write(&file, "{\"id\":\"a\"}\n{\"id\":\"b\"}\n").unwrap();
///
/// let mut tailer = Tailer::new(dir);
/// let dlq = DeadLetterStore::new(dir);
/// let stats = PipeStats::new();
///
/// assert_eq!(tailer.tail(&file, &dlq, &stats).len(), 2);
/// // Nothing new was appended
/// assert!(tailer.tail(&file, &dlq, &stats).is_empty());
/// ```
#[derive(Debug)]
pub struct Tailer {
    offsets: OffsetStore,
}

impl Tailer {
    /// Creates a tailer persisting its offsets in `state_dir`.
    #[must_use]
    pub fn new(state_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            offsets: OffsetStore::new(state_dir),
        }
    }

    /// Returns the underlying offset store.
    #[must_use]
    pub fn offsets(&self) -> &OffsetStore {
        &self.offsets
    }

    /// Drops the offset of a deleted file and rewinds its checkpoint, so a
    /// file recreated under the same name is read from its first byte.
    pub fn forget(&mut self, path: &Utf8Path) {
        match self.offsets.reset(path) {
            Ok(()) => tracing::debug!(path = %path, "Offset reset for deleted file"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Failed to rewind checkpoint of deleted file"),
        }
    }

    /// Reads every complete line appended to `path` since the last pass.
    ///
    /// Blank lines are skipped. Lines that are not JSON go to the
    /// dead-letter store and do not stop the pass. A trailing line without
    /// a newline is left for the next pass. If the file is shorter than the
    /// stored offset it was truncated or replaced, and reading restarts at 0.
    ///
    /// A file that disappeared before it could be opened is forgotten and
    /// yields nothing.
    pub fn tail(&mut self, path: &Utf8Path, dlq: &DeadLetterStore, stats: &PipeStats) -> Vec<Value> {
        let mut offset = self.offsets.get(path);

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "File vanished before tailing");
                self.offsets.forget(path);
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Cannot open watched file");
                return Vec::new();
            }
        };

        let len = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Cannot stat watched file");
                return Vec::new();
            }
        };
        if len < offset {
            tracing::warn!(path = %path, offset, len, "File shrank below its offset, reading from start");
            offset = 0;
        }
        if let Err(e) = file.seek(SeekFrom::Start(offset)) {
            tracing::warn!(path = %path, error = %e, "Cannot seek watched file");
            return Vec::new();
        }

        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut buf = Vec::new();
        let mut lines = 0_u64;

        loop {
            buf.clear();
            let n = match reader.read_until(b'\n', &mut buf) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(path = %path, offset, error = %e, "Read failed mid-file");
                    break;
                }
            };
            if n == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            offset += n as u64;

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            lines += 1;

            // Invalid UTF-8 is a decode error, never a lossy substitution
            match serde_json::from_slice::<Value>(line) {
                Ok(value) => records.push(value),
                Err(e) => {
                    stats.increment_malformed();
                    tracing::debug!(path = %path, error = %e, "Malformed line");
                    let text = String::from_utf8_lossy(line);
                    if let Err(write_err) = dlq.malformed_line(path, &e.to_string(), &text) {
                        tracing::error!(error = %write_err, "Failed to dead-letter malformed line");
                    }
                }
            }
        }

        stats.add_lines_read(lines);
        if let Err(e) = self.offsets.commit(path, offset) {
            tracing::error!(path = %path, offset, error = %e, "Failed to persist offset");
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        dir: Utf8PathBuf,
        dlq: DeadLetterStore,
        stats: PipeStats,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap().to_path_buf();
        let dlq = DeadLetterStore::new(&dir);
        Fixture {
            _tmp: tmp,
            dir,
            dlq,
            stats: PipeStats::new(),
        }
    }

    fn append(path: &Utf8Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_reads_only_new_lines() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        let mut tailer = Tailer::new(&f.dir);

        append(&file, "{\"n\":1}\n");
        assert_eq!(tailer.tail(&file, &f.dlq, &f.stats), vec![serde_json::json!({"n": 1})]);

        append(&file, "{\"n\":2}\n{\"n\":3}\n");
        let values = tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["n"], 2);
        assert_eq!(f.stats.snapshot().lines_read, 3);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "\n   \n{\"n\":1}\n\r\n");

        let mut tailer = Tailer::new(&f.dir);
        assert_eq!(tailer.tail(&file, &f.dlq, &f.stats).len(), 1);
        assert_eq!(f.stats.snapshot().lines_read, 1);
    }

    #[test]
    fn test_partial_trailing_line_waits_for_newline() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "{\"n\":1}\n{\"n\":");

        let mut tailer = Tailer::new(&f.dir);
        assert_eq!(tailer.tail(&file, &f.dlq, &f.stats).len(), 1);
        assert_eq!(tailer.offsets.get(&file), 8);

        append(&file, "2}\n");
        let values = tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values, vec![serde_json::json!({"n": 2})]);
        assert_eq!(f.stats.snapshot().malformed_lines, 0);
    }

    #[test]
    fn test_malformed_line_does_not_stop_pass() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "not json\n{\"n\":1}\n{\"n\":2}\n");

        let mut tailer = Tailer::new(&f.dir);
        assert_eq!(tailer.tail(&file, &f.dlq, &f.stats).len(), 2);

        let bad = std::fs::read_to_string(f.dir.join("s.bad.ndjson")).unwrap();
        assert_eq!(bad.lines().count(), 1);
        assert!(bad.contains("\"line\":\"not json\""));
        assert_eq!(f.stats.snapshot().malformed_lines, 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_dead_lettered() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        let mut bytes = b"{\"id\":\"sig-".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\"}\n{\"id\":\"ok\"}\n");
        std::fs::write(&file, bytes).unwrap();

        let mut tailer = Tailer::new(&f.dir);
        let values = tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values, vec![serde_json::json!({"id": "ok"})]);

        let bad = std::fs::read_to_string(f.dir.join("s.bad.ndjson")).unwrap();
        assert_eq!(bad.lines().count(), 1);
        assert_eq!(f.stats.snapshot().malformed_lines, 1);
        assert_eq!(f.stats.snapshot().lines_read, 2);
    }

    #[test]
    fn test_empty_pass_still_commits_offset() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "");

        let mut tailer = Tailer::new(&f.dir);
        assert!(tailer.tail(&file, &f.dlq, &f.stats).is_empty());
        assert!(tailer.offsets().checkpoint_path(&file).exists());
    }

    #[test]
    fn test_truncated_file_is_reread_from_start() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "{\"n\":1}\n{\"n\":2}\n");

        let mut tailer = Tailer::new(&f.dir);
        tailer.tail(&file, &f.dlq, &f.stats);

        std::fs::write(&file, "{\"n\":9}\n").unwrap();
        let values = tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values, vec![serde_json::json!({"n": 9})]);
    }

    #[test]
    fn test_resume_from_persisted_offset() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "{\"n\":1}\n");
        Tailer::new(&f.dir).tail(&file, &f.dlq, &f.stats);

        append(&file, "{\"n\":2}\n");
        let mut restarted = Tailer::new(&f.dir);
        let values = restarted.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values, vec![serde_json::json!({"n": 2})]);
    }

    #[test]
    fn test_recreated_file_is_read_from_start_after_forget() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "{\"n\":1}\n");

        let mut tailer = Tailer::new(&f.dir);
        tailer.tail(&file, &f.dlq, &f.stats);

        std::fs::remove_file(&file).unwrap();
        tailer.forget(&file);

        // Longer than the old offset, so truncation detection alone would not catch it
        append(&file, "{\"n\":2}\n{\"n\":3}\n");
        let values = tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["n"], 2);
    }

    #[test]
    fn test_missing_file_is_forgotten() {
        let f = fixture();
        let file = f.dir.join("s.ndjson");
        append(&file, "{\"n\":1}\n");

        let mut tailer = Tailer::new(&f.dir);
        tailer.tail(&file, &f.dlq, &f.stats);
        assert_eq!(tailer.offsets().tracked(), 1);

        std::fs::remove_file(&file).unwrap();
        assert!(tailer.tail(&file, &f.dlq, &f.stats).is_empty());
        assert_eq!(tailer.offsets().tracked(), 0);
    }
}
