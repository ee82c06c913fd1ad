//! File filtering for watch events.
//!
//! Filters run inside the watcher before an event is sent, so the consumer
//! only ever sees paths it cares about.
//!
//! # Examples
//!
//! ```
//! use lp_watcher::{FileFilter, GlobFilter};
//! use camino::Utf8Path;
//!
//! let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
//!
//! assert!(filter.should_process(Utf8Path::new("/inbox/signals.ndjson")));
//! assert!(!filter.should_process(Utf8Path::new("/inbox/signals.json")));
//! assert!(!filter.should_process(Utf8Path::new("/inbox/.signals.ndjson.swp")));
//! ```

use camino::Utf8Path;
use glob::{MatchOptions, Pattern};
use smallvec::SmallVec;

use crate::error::WatchError;

/// A filter for determining which file events to process.
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// watcher thread, and `'static` to be moved into it.
///
/// # Examples
///
/// ```
/// use lp_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoHiddenFiles;
///
/// impl FileFilter for NoHiddenFiles {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         !path.file_name().is_some_and(|name| name.starts_with('.'))
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at the given path should be reported.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// A filter matching file names against one or more glob patterns.
///
/// Patterns are matched against the file name only, never the directory
/// part, and a leading `.` must be matched literally so editor swap files
/// and other hidden files are skipped by `*` patterns.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    patterns: SmallVec<[Pattern; 2]>,
}

impl GlobFilter {
    /// Match options shared by every pattern.
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    /// Compiles a glob filter.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, WatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| WatchError::invalid_pattern(p, e.msg))
            })
            .collect::<Result<SmallVec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns the source text of each compiled pattern.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}

impl FileFilter for GlobFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(name, Self::OPTIONS))
    }
}

// Implement FileFilter for boxed filters
impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

// Implement FileFilter for Arc-wrapped filters (useful for shared filters)
impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all_filter() {
        let filter = AcceptAllFilter;
        assert!(filter.should_process(Utf8Path::new("anything.txt")));
        assert!(filter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_glob_filter_matches_file_name_only() {
        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();

        assert!(filter.should_process(Utf8Path::new("signals.ndjson")));
        assert!(filter.should_process(Utf8Path::new("/deep/dir.ndjson/signals.ndjson")));
        assert!(!filter.should_process(Utf8Path::new("/inbox.ndjson/readme.md")));
        assert!(!filter.should_process(Utf8Path::new("signals.ndjson.tmp")));
    }

    #[test]
    fn test_glob_filter_skips_hidden_files() {
        let filter = GlobFilter::new(&["*.ndjson"]).unwrap();
        assert!(!filter.should_process(Utf8Path::new("/inbox/.partial.ndjson")));
    }

    #[test]
    fn test_glob_filter_multiple_patterns() {
        let filter = GlobFilter::new(&["*.ndjson", "signals-*.jsonl"]).unwrap();

        assert!(filter.should_process(Utf8Path::new("a.ndjson")));
        assert!(filter.should_process(Utf8Path::new("signals-2025.jsonl")));
        assert!(!filter.should_process(Utf8Path::new("trades-2025.jsonl")));
        assert_eq!(filter.patterns().count(), 2);
    }

    #[test]
    fn test_glob_filter_invalid_pattern() {
        let err = GlobFilter::new(&["[unclosed"]).unwrap_err();
        assert!(matches!(err, WatchError::InvalidPattern { .. }));
        assert!(err.to_string().contains("[unclosed"));
    }

    #[test]
    fn test_boxed_filter() {
        let filter: Box<dyn FileFilter> = Box::new(GlobFilter::new(&["*.ndjson"]).unwrap());
        assert!(filter.should_process(Utf8Path::new("a.ndjson")));
        assert!(!filter.should_process(Utf8Path::new("a.json")));
    }

    #[test]
    fn test_arc_filter() {
        let filter = std::sync::Arc::new(GlobFilter::new(&["*.ndjson"]).unwrap());
        assert!(filter.should_process(Utf8Path::new("a.ndjson")));
    }
}
