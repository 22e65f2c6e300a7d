//! Combining several databases into one document-id space.
//!
//! Shard-local ids are interleaved into global ids:
//! `global = (local - 1) * shard_count + shard + 1`. With a single shard
//! global and local ids coincide.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::database::Database;
use crate::document::Document;
use crate::error::{EnquireError, Result};
use crate::types::DocId;

/// An ordered set of shards searched together.
#[derive(Debug, Clone)]
pub struct ShardSet {
    shards: Vec<Arc<dyn Database>>,
}

impl ShardSet {
    /// Create a shard set. At least one shard is required.
    pub fn new(shards: Vec<Arc<dyn Database>>) -> Result<Self> {
        if shards.is_empty() {
            return Err(EnquireError::invalid_argument(
                "a shard set needs at least one database",
            ));
        }
        Ok(ShardSet { shards })
    }

    /// A shard set over a single database.
    pub fn single(db: Arc<dyn Database>) -> Self {
        ShardSet { shards: vec![db] }
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Always false; a shard set is never empty.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// The shards in order.
    pub fn shards(&self) -> &[Arc<dyn Database>] {
        &self.shards
    }

    /// Map a shard-local id to a global id.
    pub fn to_global(&self, shard: usize, local: DocId) -> DocId {
        (local - 1) * self.shards.len() as DocId + shard as DocId + 1
    }

    /// Map a global id to `(shard, local id)`.
    pub fn to_local(&self, global: DocId) -> Result<(usize, DocId)> {
        if global == 0 {
            return Err(EnquireError::invalid_argument("document id 0 is not valid"));
        }
        let n = self.shards.len() as DocId;
        let shard = ((global - 1) % n) as usize;
        let local = (global - 1) / n + 1;
        Ok((shard, local))
    }

    /// Read a document by global id.
    pub fn fetch_document(&self, global: DocId) -> Result<Arc<Document>> {
        let (shard, local) = self.to_local(global)?;
        let doc = self.shards[shard].fetch_document(local)?;
        Ok(self.globalize(doc, global))
    }

    /// Forward a prefetch hint to the owning shard.
    pub fn request_document(&self, global: DocId) {
        if let Ok((shard, local)) = self.to_local(global) {
            self.shards[shard].request_document(local);
        }
    }

    /// Read several documents, one batched call per shard involved.
    ///
    /// Results are returned in the order of `globals`.
    pub fn fetch_documents(&self, globals: &[DocId]) -> Vec<Result<Arc<Document>>> {
        let mut results: Vec<Option<Result<Arc<Document>>>> =
            globals.iter().map(|_| None).collect();
        let mut per_shard: BTreeMap<usize, Vec<(usize, DocId)>> = BTreeMap::new();

        for (pos, global) in globals.iter().enumerate() {
            match self.to_local(*global) {
                Ok((shard, local)) => per_shard.entry(shard).or_default().push((pos, local)),
                Err(e) => results[pos] = Some(Err(e)),
            }
        }

        for (shard, wanted) in per_shard {
            let locals: Vec<DocId> = wanted.iter().map(|(_, local)| *local).collect();
            let fetched = self.shards[shard].fetch_documents(&locals);
            for ((pos, _), doc) in wanted.into_iter().zip(fetched) {
                let global = globals[pos];
                results[pos] = Some(doc.map(|d| self.globalize(d, global)));
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(EnquireError::other("document was not fetched"))))
            .collect()
    }

    fn globalize(&self, doc: Arc<Document>, global: DocId) -> Arc<Document> {
        if doc.doc_id() == global {
            return doc;
        }
        let mut copy = (*doc).clone();
        copy.set_doc_id(global);
        Arc::new(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;

    fn two_shards() -> (Arc<MemoryDatabase>, Arc<MemoryDatabase>, ShardSet) {
        let a = Arc::new(MemoryDatabase::from_documents(vec![
            Document::builder().data("a1").build(),
            Document::builder().data("a2").build(),
        ]));
        let b = Arc::new(MemoryDatabase::from_documents(vec![
            Document::builder().data("b1").build(),
        ]));
        let set = ShardSet::new(vec![a.clone() as Arc<dyn Database>, b.clone()]).unwrap();
        (a, b, set)
    }

    #[test]
    fn test_id_mapping() {
        let (_, _, set) = two_shards();
        assert_eq!(set.to_global(0, 1), 1);
        assert_eq!(set.to_global(1, 1), 2);
        assert_eq!(set.to_global(0, 2), 3);
        assert_eq!(set.to_local(3).unwrap(), (0, 2));
        assert_eq!(set.to_local(2).unwrap(), (1, 1));
        assert!(set.to_local(0).is_err());
        assert!(ShardSet::new(Vec::new()).is_err());
    }

    #[test]
    fn test_fetch_globalizes_ids() {
        let (_, _, set) = two_shards();
        let doc = set.fetch_document(3).unwrap();
        assert_eq!(doc.data(), "a2");
        assert_eq!(doc.doc_id(), 3);
        assert!(set.fetch_document(4).unwrap_err().is_not_found());
    }

    #[test]
    fn test_batched_fetch_groups_by_shard() {
        let (a, b, set) = two_shards();
        let docs = set.fetch_documents(&[2, 1, 3, 6]);
        assert_eq!(docs[0].as_ref().unwrap().data(), "b1");
        assert_eq!(docs[1].as_ref().unwrap().data(), "a1");
        assert_eq!(docs[2].as_ref().unwrap().data(), "a2");
        assert!(docs[3].as_ref().unwrap_err().is_not_found());

        assert_eq!(a.stats().fetch_calls, 1);
        assert_eq!(b.stats().fetch_calls, 1);
    }
}
