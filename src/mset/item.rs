//! A single entry of a match set.

use serde::{Deserialize, Serialize};

use crate::types::{DocCount, DocId};

/// A scored document in a match set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MSetItem {
    /// Raw weight assigned by the weighting scheme.
    pub weight: f64,
    /// Global document id.
    pub doc_id: DocId,
    /// Collapse key value, empty when the document has none.
    pub collapse_key: Vec<u8>,
    /// Documents with the same collapse key suppressed so far in this run.
    pub collapse_count: DocCount,
    /// Sort key value, empty unless sorting by value.
    pub sort_key: Vec<u8>,
}

impl MSetItem {
    /// Create an item with no collapse or sort key.
    pub fn new(doc_id: DocId, weight: f64) -> Self {
        MSetItem {
            weight,
            doc_id,
            collapse_key: Vec::new(),
            collapse_count: 0,
            sort_key: Vec::new(),
        }
    }

    /// Whether the item carries a collapse key.
    pub fn has_collapse_key(&self) -> bool {
        !self.collapse_key.is_empty()
    }
}
