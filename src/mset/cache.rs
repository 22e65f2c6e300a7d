//! Rank-indexed document cache of a match set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::document::Document;

/// Documents requested or fetched for a match set, keyed by rank index.
///
/// `requested` only ever holds indices that are not in `cached`.
#[derive(Debug, Default)]
pub(crate) struct DocumentCache {
    requested: BTreeSet<usize>,
    cached: HashMap<usize, Arc<Document>>,
}

impl DocumentCache {
    pub(crate) fn get(&self, index: usize) -> Option<Arc<Document>> {
        self.cached.get(&index).cloned()
    }

    /// Mark an index as wanted. Returns `false` if it is already cached or
    /// already pending.
    pub(crate) fn request(&mut self, index: usize) -> bool {
        if self.cached.contains_key(&index) {
            return false;
        }
        self.requested.insert(index)
    }

    /// The half-open range spanning every pending index.
    pub(crate) fn pending_envelope(&self) -> Option<(usize, usize)> {
        let first = *self.requested.first()?;
        let last = *self.requested.last()?;
        Some((first, last + 1))
    }

    /// Remove and return the pending indices in `[first, last)`.
    pub(crate) fn take_pending(&mut self, first: usize, last: usize) -> Vec<usize> {
        if first >= last {
            return Vec::new();
        }
        let taken: Vec<usize> = self.requested.range(first..last).copied().collect();
        for index in &taken {
            self.requested.remove(index);
        }
        taken
    }

    /// Cache `doc` at `index`. A document already cached there wins, so
    /// readers racing on the same index share one copy.
    pub(crate) fn insert(&mut self, index: usize, doc: Arc<Document>) {
        self.requested.remove(&index);
        self.cached.entry(index).or_insert(doc);
    }

    pub(crate) fn pending(&self) -> usize {
        self.requested.len()
    }

    pub(crate) fn cached(&self) -> usize {
        self.cached.len()
    }
}
