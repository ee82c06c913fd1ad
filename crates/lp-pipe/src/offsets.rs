//! Persisted read offsets, one checkpoint file per watched path.
//!
//! A checkpoint is a small JSON object `{"path": ..., "offset": ...}` stored
//! in the state directory under `sha256_<hex>.json`, where `<hex>` is the
//! SHA-256 of the JSON-encoded path. Checkpoints are written to a temporary
//! sibling first and renamed into place, so a crash leaves either the old
//! or the new offset on disk.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use lp_core::{FxHashMap, fx_hash_map, stable_path_key};

use crate::error::PipeError;

/// On-disk form of a read offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The watched file.
    pub path: Utf8PathBuf,
    /// Byte offset just past the last consumed line.
    pub offset: u64,
}

/// Per-file read offsets, cached in memory and persisted in `state_dir`.
///
/// Only the pipe main loop touches the store, so it needs no locking.
///
/// # Examples
///
/// ```
/// use lp_pipe::OffsetStore;
/// use camino::Utf8Path;
///
/// # fn main() -> Result<(), lp_pipe::PipeError> {
/// # let tmp = tempfile::TempDir::new().unwrap();
/// # let state_dir = Utf8Path::from_path(tmp.path()).unwrap();
/// let mut store = OffsetStore::new(state_dir);
/// let file = Utf8Path::new("/inbox/signals.ndjson");
///
/// assert_eq!(store.get(file), 0);
/// store.commit(file, 128)?;
///
/// // A fresh store reads the persisted value back.
/// let mut reopened = OffsetStore::new(state_dir);
/// assert_eq!(reopened.get(file), 128);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OffsetStore {
    state_dir: Utf8PathBuf,
    offsets: FxHashMap<Utf8PathBuf, u64>,
}

impl OffsetStore {
    /// Creates a store over `state_dir`. The directory must exist before
    /// the first [`commit`](Self::commit).
    #[must_use]
    pub fn new(state_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            offsets: fx_hash_map(),
        }
    }

    /// Returns the checkpoint file used for `path`.
    #[must_use]
    pub fn checkpoint_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.state_dir.join(format!("{}.json", stable_path_key(path)))
    }

    /// Returns the current offset for `path`, loading it from disk the first
    /// time the path is seen.
    pub fn get(&mut self, path: &Utf8Path) -> u64 {
        if let Some(&offset) = self.offsets.get(path) {
            return offset;
        }
        let offset = self.load(path);
        self.offsets.insert(path.to_path_buf(), offset);
        offset
    }

    /// Reads the persisted offset for `path`.
    ///
    /// A missing checkpoint reads as 0. So does an unreadable or corrupt
    /// one, which is logged.
    #[must_use]
    pub fn load(&self, path: &Utf8Path) -> u64 {
        let file = self.checkpoint_path(path);
        let text = match std::fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(checkpoint = %file, error = %e, "Unreadable checkpoint, starting from 0");
                return 0;
            }
        };
        match serde_json::from_str::<Checkpoint>(&text) {
            Ok(checkpoint) => checkpoint.offset,
            Err(e) => {
                tracing::warn!(checkpoint = %file, error = %e, "Corrupt checkpoint, starting from 0");
                0
            }
        }
    }

    /// Records `offset` for `path` and persists it.
    ///
    /// The in-memory value is updated even if the write fails, so the
    /// running pipe does not re-read data it already consumed.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the checkpoint cannot be written.
    pub fn commit(&mut self, path: &Utf8Path, offset: u64) -> Result<(), PipeError> {
        self.offsets.insert(path.to_path_buf(), offset);

        let file = self.checkpoint_path(path);
        let tmp = file.with_extension("json.tmp");
        let body = serde_json::to_vec(&Checkpoint {
            path: path.to_path_buf(),
            offset,
        })?;

        std::fs::write(&tmp, body).map_err(|e| PipeError::io(&tmp, e))?;
        std::fs::rename(&tmp, &file).map_err(|e| PipeError::io(&file, e))?;

        tracing::trace!(path = %path, offset, "Offset committed");
        Ok(())
    }

    /// Drops the in-memory entry for `path`. The checkpoint on disk is kept.
    pub fn forget(&mut self, path: &Utf8Path) -> bool {
        self.offsets.remove(path).is_some()
    }

    /// Drops the in-memory entry for `path` and rewinds its checkpoint to 0,
    /// so a file later recreated at the same path is read from the start.
    ///
    /// The checkpoint file is rewritten, not removed.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Io`] if the checkpoint cannot be written.
    pub fn reset(&mut self, path: &Utf8Path) -> Result<(), PipeError> {
        let result = self.commit(path, 0);
        self.offsets.remove(path);
        result
    }

    /// Number of paths with an in-memory offset.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.offsets.len()
    }
}
