//! Bounded, insertion-ordered window of recently admitted signal ids.

use std::collections::VecDeque;

use lp_core::{FxHashSet, fx_hash_set_with_capacity};

/// Suppresses re-delivery of ids still inside the window.
///
/// The window holds at most `capacity` ids and evicts the oldest first, so
/// an id is admitted again once `capacity` other ids have been admitted
/// after it. A capacity of zero disables suppression.
///
/// # Examples
///
/// ```
/// use lp_pipe::DedupWindow;
///
/// let mut window = DedupWindow::new(2);
/// assert!(window.admit("a"));
/// assert!(!window.admit("a"));
/// assert!(window.admit("b"));
/// assert!(window.admit("c")); // evicts "a"
/// assert!(window.admit("a"));
/// ```
#[derive(Debug)]
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    members: FxHashSet<String>,
}

impl DedupWindow {
    /// Upper bound on memory reserved up front.
    const MAX_PREALLOC: usize = 4096;

    /// Creates an empty window holding at most `capacity` ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let prealloc = capacity.min(Self::MAX_PREALLOC);
        Self {
            capacity,
            order: VecDeque::with_capacity(prealloc),
            members: fx_hash_set_with_capacity(prealloc),
        }
    }

    /// Returns `true` and records `id` if it is not in the window.
    /// Returns `false` if it is.
    pub fn admit(&mut self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if self.members.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(id.to_owned());
        self.members.insert(id.to_owned());
        true
    }

    /// Returns `true` if `id` is currently in the window.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Number of ids in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no id has been admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of ids held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
