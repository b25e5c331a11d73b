use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use podscribe_types::IncarnationId;

/// Thread-safe set of container incarnations that already have a collector.
///
/// Entries are never removed: the set grows by one entry per incarnation seen
/// during the lifetime of the process.
#[derive(Clone, Debug, Default)]
pub struct IncarnationTracker {
    seen: Arc<Mutex<HashSet<IncarnationId>>>,
}

impl IncarnationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a collector was already started for `id`
    pub fn has(&self, id: &IncarnationId) -> bool {
        self.seen.lock().contains(id)
    }

    /// Record `id` unconditionally
    pub fn insert(&self, id: IncarnationId) {
        self.seen.lock().insert(id);
    }

    /// Record `id` if it is new.
    ///
    /// Returns `true` exactly once per id, no matter how many callers race.
    pub fn try_insert(&self, id: IncarnationId) -> bool {
        self.seen.lock().insert(id)
    }

    /// Number of incarnations seen so far
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
