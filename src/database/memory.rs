//! In-memory database.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::RwLock;

use crate::database::{Database, Posting};
use crate::document::{Document, FieldValue};
use crate::error::{EnquireError, Result};
use crate::types::{DocCount, DocId, TermCount, ValueSlot};

#[derive(Debug, Default)]
struct MemoryIndex {
    documents: BTreeMap<DocId, Arc<Document>>,
    postings: BTreeMap<String, BTreeMap<DocId, TermCount>>,
    total_length: u64,
    last_doc_id: DocId,
}

impl MemoryIndex {
    fn index(&mut self, doc_id: DocId, mut doc: Document) {
        doc.set_doc_id(doc_id);
        for (term, wdf) in doc.terms() {
            self.postings
                .entry(term.to_string())
                .or_default()
                .insert(doc_id, wdf);
        }
        self.total_length += u64::from(doc.length());
        self.documents.insert(doc_id, Arc::new(doc));
    }

    fn unindex(&mut self, doc_id: DocId) -> Option<Arc<Document>> {
        let doc = self.documents.remove(&doc_id)?;
        for (term, _) in doc.terms() {
            if let Some(list) = self.postings.get_mut(term) {
                list.remove(&doc_id);
                if list.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        self.total_length -= u64::from(doc.length());
        Some(doc)
    }

    fn document(&self, doc_id: DocId) -> Result<&Arc<Document>> {
        self.documents
            .get(&doc_id)
            .ok_or_else(|| EnquireError::not_found(format!("document {doc_id}")))
    }
}

/// Counters describing how the database has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStats {
    /// Documents read through `fetch_document`/`fetch_documents`.
    pub documents_fetched: u64,
    /// Number of read calls (a batch counts once).
    pub fetch_calls: u64,
    /// Prefetch hints received.
    pub requests: u64,
}

/// A database held entirely in memory.
///
/// Document ids are assigned sequentially from 1. Reads take a shared lock,
/// so a `MemoryDatabase` can back several sessions at once.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    index: RwLock<MemoryIndex>,
    documents_fetched: AtomicU64,
    fetch_calls: AtomicU64,
    requests: AtomicU64,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        MemoryDatabase::default()
    }

    /// Create a database holding `docs`, with ids 1..=n in order.
    pub fn from_documents<I: IntoIterator<Item = Document>>(docs: I) -> Self {
        let db = MemoryDatabase::new();
        for doc in docs {
            db.add_document(doc);
        }
        db
    }

    /// Add a document and return its id.
    pub fn add_document(&self, doc: Document) -> DocId {
        let mut index = self.index.write();
        index.last_doc_id += 1;
        let doc_id = index.last_doc_id;
        index.index(doc_id, doc);
        doc_id
    }

    /// Replace (or create) the document with id `doc_id`.
    pub fn replace_document(&self, doc_id: DocId, doc: Document) -> Result<()> {
        if doc_id == 0 {
            return Err(EnquireError::invalid_argument("document id 0 is not valid"));
        }
        let mut index = self.index.write();
        index.unindex(doc_id);
        index.index(doc_id, doc);
        index.last_doc_id = index.last_doc_id.max(doc_id);
        Ok(())
    }

    /// Delete a document. Fails with `NotFound` if it does not exist.
    pub fn delete_document(&self, doc_id: DocId) -> Result<()> {
        self.index
            .write()
            .unindex(doc_id)
            .map(|_| ())
            .ok_or_else(|| EnquireError::not_found(format!("document {doc_id}")))
    }

    /// Read counters accumulated since creation or the last reset.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            documents_fetched: self.documents_fetched.load(Ordering::SeqCst),
            fetch_calls: self.fetch_calls.load(Ordering::SeqCst),
            requests: self.requests.load(Ordering::SeqCst),
        }
    }

    /// Reset the read counters.
    pub fn reset_stats(&self) {
        self.documents_fetched.store(0, Ordering::SeqCst);
        self.fetch_calls.store(0, Ordering::SeqCst);
        self.requests.store(0, Ordering::SeqCst);
    }
}

impl Database for MemoryDatabase {
    fn doc_count(&self) -> Result<DocCount> {
        Ok(self.index.read().documents.len() as DocCount)
    }

    fn total_length(&self) -> Result<u64> {
        Ok(self.index.read().total_length)
    }

    fn term_freq(&self, term: &str) -> Result<DocCount> {
        Ok(self
            .index
            .read()
            .postings
            .get(term)
            .map(|list| list.len() as DocCount)
            .unwrap_or(0))
    }

    fn postings(&self, term: &str) -> Result<Vec<Posting>> {
        Ok(self
            .index
            .read()
            .postings
            .get(term)
            .map(|list| {
                list.iter()
                    .map(|(doc_id, wdf)| Posting {
                        doc_id: *doc_id,
                        wdf: *wdf,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn doc_length(&self, doc_id: DocId) -> Result<TermCount> {
        Ok(self.index.read().document(doc_id)?.length())
    }

    fn term_list(&self, doc_id: DocId) -> Result<Vec<(String, TermCount)>> {
        Ok(self
            .index
            .read()
            .document(doc_id)?
            .terms()
            .map(|(term, wdf)| (term.to_string(), wdf))
            .collect())
    }

    fn value(&self, doc_id: DocId, slot: ValueSlot) -> Result<Option<FieldValue>> {
        Ok(self.index.read().document(doc_id)?.value(slot).cloned())
    }

    fn fetch_document(&self, doc_id: DocId) -> Result<Arc<Document>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let doc = Arc::clone(self.index.read().document(doc_id)?);
        self.documents_fetched.fetch_add(1, Ordering::SeqCst);
        Ok(doc)
    }

    fn request_document(&self, doc_id: DocId) {
        trace!("prefetch hint for document {doc_id}");
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn fetch_documents(&self, doc_ids: &[DocId]) -> Vec<Result<Arc<Document>>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let index = self.index.read();
        doc_ids
            .iter()
            .map(|doc_id| {
                let doc = Arc::clone(index.document(*doc_id)?);
                self.documents_fetched.fetch_add(1, Ordering::SeqCst);
                Ok(doc)
            })
            .collect()
    }
}
