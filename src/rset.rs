//! Relevance set: documents the caller marked as relevant.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{EnquireError, Result};
use crate::mset::MSetItem;
use crate::types::{DocCount, DocId};

/// A set of relevant document ids.
///
/// Cloning is O(1): clones share the id set until one of them is modified
/// (copy on write), so handing an `RSet` to an evaluation never observes
/// later edits made by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RSet {
    items: Arc<BTreeSet<DocId>>,
}

impl RSet {
    /// Create an empty relevance set.
    pub fn new() -> Self {
        RSet::default()
    }

    /// Mark a document as relevant. Document id 0 is rejected.
    pub fn add_document(&mut self, doc_id: DocId) -> Result<()> {
        if doc_id == 0 {
            return Err(EnquireError::invalid_argument("document id 0 is not valid"));
        }
        Arc::make_mut(&mut self.items).insert(doc_id);
        Ok(())
    }

    /// Mark the document of a match set item as relevant.
    pub fn add_item(&mut self, item: &MSetItem) -> Result<()> {
        self.add_document(item.doc_id)
    }

    /// Remove a document; returns whether it was present.
    pub fn remove_document(&mut self, doc_id: DocId) -> bool {
        if !self.items.contains(&doc_id) {
            return false;
        }
        Arc::make_mut(&mut self.items).remove(&doc_id)
    }

    /// Whether `doc_id` is in the set.
    pub fn contains(&self, doc_id: DocId) -> bool {
        self.items.contains(&doc_id)
    }

    /// Number of documents in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Number of documents, as a document count.
    pub fn size(&self) -> DocCount {
        self.items.len() as DocCount
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.items.iter().copied()
    }

    /// Get a human-readable description of this set.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl FromIterator<DocId> for RSet {
    /// Collect ids into a set; id 0 is skipped.
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        RSet {
            items: Arc::new(iter.into_iter().filter(|id| *id != 0).collect()),
        }
    }
}

impl fmt::Display for RSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.items.iter().map(|id| id.to_string()).collect();
        write!(f, "RSet(items=[{}])", ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let mut rset = RSet::new();
        assert!(rset.is_empty());

        rset.add_document(3).unwrap();
        rset.add_document(1).unwrap();
        rset.add_document(3).unwrap();
        assert_eq!(rset.len(), 2);
        assert!(rset.contains(3));
        assert_eq!(rset.iter().collect::<Vec<_>>(), vec![1, 3]);

        assert!(rset.remove_document(3));
        assert!(!rset.remove_document(3));
        assert_eq!(rset.size(), 1);

        assert!(rset.add_document(0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let mut original: RSet = [1, 2].into_iter().collect();
        let snapshot = original.clone();
        original.add_document(5).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.contains(5));
        assert_eq!(original.len(), 3);
    }

    #[test]
    fn test_description() {
        let rset: RSet = [2, 0, 7].into_iter().collect();
        assert_eq!(rset.description(), "RSet(items=[2, 7])");
    }
}
