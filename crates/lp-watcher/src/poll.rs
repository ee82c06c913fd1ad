//! Directory-listing change detection for the polling backend.
//!
//! Each scan lists the watched directory, keeps the files accepted by the
//! filter, and diffs `(mtime, len)` against the previous scan.

use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use lp_core::{FxHashMap, fx_hash_map};

use crate::error::WatchError;
use crate::events::WatchEvent;
use crate::filter::FileFilter;

/// Size and modification time of a file at the last scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// What the poller saw on its previous pass.
#[derive(Debug, Default)]
pub struct PollState {
    seen: FxHashMap<Utf8PathBuf, Fingerprint>,
}

impl PollState {
    /// Creates an empty state; the first scan reports every file as created.
    #[must_use]
    pub fn new() -> Self {
        Self { seen: fx_hash_map() }
    }

    /// Number of files recorded by the last scan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if the last scan found no matching files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Lists `dir` and returns the changes since the previous scan.
    ///
    /// Events come back sorted by path: created and modified files first,
    /// then deletions.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Io`] if the directory cannot be listed.
    /// Files that vanish between listing and `stat` are skipped.
    pub fn scan<F: FileFilter + ?Sized>(
        &mut self,
        dir: &Utf8Path,
        filter: &F,
    ) -> Result<Vec<WatchEvent>, WatchError> {
        let mut current = fx_hash_map();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = match Utf8PathBuf::try_from(entry.path()) {
                Ok(path) => path,
                Err(e) => {
                    let err = WatchError::non_utf8_path(e.into_path_buf());
                    tracing::warn!(error = %err, "Skipping directory entry");
                    continue;
                }
            };
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() || !filter.should_process(&path) {
                continue;
            }
            current.insert(
                path,
                Fingerprint {
                    modified: meta.modified().ok(),
                    len: meta.len(),
                },
            );
        }

        let mut changed: Vec<WatchEvent> = current
            .iter()
            .filter_map(|(path, print)| match self.seen.get(path) {
                None => Some(WatchEvent::created(path.clone())),
                Some(prev) if prev != print => Some(WatchEvent::modified(path.clone())),
                Some(_) => None,
            })
            .collect();
        changed.sort_by(|a, b| a.path.cmp(&b.path));

        let mut removed: Vec<WatchEvent> = self
            .seen
            .keys()
            .filter(|path| !current.contains_key(*path))
            .map(|path| WatchEvent::deleted(path.clone()))
            .collect();
        removed.sort_by(|a, b| a.path.cmp(&b.path));

        changed.extend(removed);
        self.seen = current;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WatchEventKind;
    use crate::filter::GlobFilter;
    use std::fs;
    use tempfile::TempDir;

    fn kinds(events: &[WatchEvent]) -> Vec<(&str, WatchEventKind)> {
        events
            .iter()
            .map(|e| (e.file_name().unwrap_or_default(), e.kind))
            .collect()
    }

    #[test]
    fn test_first_scan_reports_existing_files_as_created() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        fs::write(dir.join("b.ndjson"), "{}\n").unwrap();
        fs::write(dir.join("a.ndjson"), "").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.join("sub.ndjson")).unwrap();

        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
        let mut state = PollState::new();
        let events = state.scan(dir, &filter).unwrap();

        assert_eq!(
            kinds(&events),
            vec![
                ("a.ndjson", WatchEventKind::Created),
                ("b.ndjson", WatchEventKind::Created),
            ]
        );
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_unchanged_directory_reports_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        fs::write(dir.join("a.ndjson"), "{}\n").unwrap();

        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
        let mut state = PollState::new();
        state.scan(dir, &filter).unwrap();

        assert!(state.scan(dir, &filter).unwrap().is_empty());
    }

    #[test]
    fn test_growth_is_reported_as_modified() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let file = dir.join("a.ndjson");
        fs::write(&file, "{}\n").unwrap();

        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
        let mut state = PollState::new();
        state.scan(dir, &filter).unwrap();

        fs::write(&file, "{}\n{}\n").unwrap();
        let events = state.scan(dir, &filter).unwrap();
        assert_eq!(kinds(&events), vec![("a.ndjson", WatchEventKind::Modified)]);
    }

    #[test]
    fn test_removed_file_is_reported_as_deleted() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let file = dir.join("a.ndjson");
        fs::write(&file, "{}\n").unwrap();

        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
        let mut state = PollState::new();
        state.scan(dir, &filter).unwrap();

        fs::remove_file(&file).unwrap();
        let events = state.scan(dir, &filter).unwrap();
        assert_eq!(kinds(&events), vec![("a.ndjson", WatchEventKind::Deleted)]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("gone");
        let mut state = PollState::new();
        let err = state.scan(&dir, &crate::filter::AcceptAllFilter).unwrap_err();
        assert!(matches!(err, WatchError::Io(_)));
    }
}
