//! Backend abstraction: the storage a session reads documents and
//! statistics from.
//!
//! A [`Database`] answers the questions the evaluators ask (collection
//! statistics, postings, term lists, value slots) and serves documents by
//! id. Document reads come in two flavours so that remote or disk backed
//! implementations can batch: [`Database::request_document`] is a
//! non-blocking hint, [`Database::fetch_documents`] a batched read.

pub mod memory;
pub mod shards;

use std::fmt::Debug;
use std::sync::Arc;

use crate::document::{Document, FieldValue};
use crate::error::Result;
use crate::types::{DocCount, DocId, TermCount, ValueSlot};

pub use memory::{BackendStats, MemoryDatabase};
pub use shards::ShardSet;

/// One entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Document containing the term.
    pub doc_id: DocId,
    /// Within-document frequency of the term.
    pub wdf: TermCount,
}

/// Trait for storage backends serving documents and postings.
pub trait Database: Send + Sync + Debug {
    /// Number of documents in the database.
    fn doc_count(&self) -> Result<DocCount>;

    /// Sum of the lengths of all documents.
    fn total_length(&self) -> Result<u64>;

    /// Average document length, 0 for an empty database.
    fn average_length(&self) -> Result<f64> {
        let docs = self.doc_count()?;
        if docs == 0 {
            return Ok(0.0);
        }
        Ok(self.total_length()? as f64 / docs as f64)
    }

    /// Number of documents indexed by `term`.
    fn term_freq(&self, term: &str) -> Result<DocCount>;

    /// Posting list of `term`, ordered by document id.
    fn postings(&self, term: &str) -> Result<Vec<Posting>>;

    /// Length of a document.
    fn doc_length(&self, doc_id: DocId) -> Result<TermCount>;

    /// The `(term, wdf)` pairs indexing a document, in term order.
    fn term_list(&self, doc_id: DocId) -> Result<Vec<(String, TermCount)>>;

    /// The value stored in `slot` of a document.
    fn value(&self, doc_id: DocId, slot: ValueSlot) -> Result<Option<FieldValue>>;

    /// Read one document. Fails with `NotFound` if it does not exist.
    fn fetch_document(&self, doc_id: DocId) -> Result<Arc<Document>>;

    /// Hint that `doc_id` will be read soon.
    ///
    /// Must not block. The default implementation ignores the hint.
    fn request_document(&self, doc_id: DocId) {
        let _ = doc_id;
    }

    /// Read several documents in one round trip.
    ///
    /// The result has one entry per requested id, in request order, so a
    /// missing document does not fail the rest of the batch.
    fn fetch_documents(&self, doc_ids: &[DocId]) -> Vec<Result<Arc<Document>>> {
        doc_ids.iter().map(|id| self.fetch_document(*id)).collect()
    }
}
