//! Match sets: one windowed view of a ranked match run.
//!
//! An [`MSet`] is a cheap handle around immutable result data. Cloning it
//! copies a pointer. The only state that changes after construction is the
//! document cache, which turns rank-indexed document reads into batched
//! backend fetches:
//!
//! - [`MSet::fetch`] marks indices as wanted and sends prefetch hints.
//! - [`MSet::document`] serves from the cache, or fetches every pending
//!   index in one batch before returning the one asked for. The backend
//!   is read without the cache lock held.
//!
//! Two match sets built from the same evaluation compare equal whatever
//! their caches hold.

mod cache;
mod item;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::database::ShardSet;
use crate::document::Document;
use crate::error::{EnquireError, Result};
use crate::types::DocCount;

use cache::DocumentCache;
pub use item::MSetItem;

/// Statistics for one query term.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TermStats {
    /// Number of documents the term indexes across all shards.
    pub term_freq: DocCount,
    /// Maximum weight the term can contribute.
    pub term_weight: f64,
}

/// `100 / max_attained`, or 0 when nothing positive was attained.
pub(crate) fn percent_factor(max_attained: f64) -> f64 {
    if max_attained > 0.0 {
        100.0 / max_attained
    } else {
        0.0
    }
}

/// Round `weight * factor` half away from zero into `[1, 100]`; weights
/// that are not positive give 0.
pub(crate) fn weight_to_percent(weight: f64, factor: f64) -> u8 {
    if weight.is_nan() || weight <= 0.0 || factor <= 0.0 {
        return 0;
    }
    (weight * factor).round().clamp(1.0, 100.0) as u8
}

#[derive(Debug, Default)]
struct MSetInternal {
    percent_factor: f64,
    term_stats: BTreeMap<String, TermStats>,
    items: Vec<MSetItem>,
    first_rank: DocCount,
    matches_lower_bound: DocCount,
    matches_estimated: DocCount,
    matches_upper_bound: DocCount,
    max_possible: f64,
    max_attained: f64,
    source: Option<Arc<ShardSet>>,
    cache: Mutex<DocumentCache>,
}

impl PartialEq for MSetInternal {
    fn eq(&self, other: &Self) -> bool {
        self.percent_factor == other.percent_factor
            && self.term_stats == other.term_stats
            && self.items == other.items
            && self.first_rank == other.first_rank
            && self.matches_lower_bound == other.matches_lower_bound
            && self.matches_estimated == other.matches_estimated
            && self.matches_upper_bound == other.matches_upper_bound
            && self.max_possible == other.max_possible
            && self.max_attained == other.max_attained
    }
}

/// A ranked window of scored documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MSet {
    internal: Arc<MSetInternal>,
}

/// Assembles an [`MSet`]; only the session and evaluators build them.
#[derive(Debug, Default)]
pub(crate) struct MSetBuilder {
    pub(crate) term_stats: BTreeMap<String, TermStats>,
    pub(crate) items: Vec<MSetItem>,
    pub(crate) first_rank: DocCount,
    pub(crate) matches_lower_bound: DocCount,
    pub(crate) matches_estimated: DocCount,
    pub(crate) matches_upper_bound: DocCount,
    pub(crate) max_possible: f64,
    pub(crate) max_attained: f64,
}

impl MSetBuilder {
    pub(crate) fn build(self, source: Option<Arc<ShardSet>>) -> MSet {
        let percent_factor = percent_factor(self.max_attained);
        MSet {
            internal: Arc::new(MSetInternal {
                percent_factor,
                term_stats: self.term_stats,
                items: self.items,
                first_rank: self.first_rank,
                matches_lower_bound: self.matches_lower_bound,
                matches_estimated: self.matches_estimated,
                matches_upper_bound: self.matches_upper_bound,
                max_possible: self.max_possible,
                max_attained: self.max_attained,
                source,
                cache: Mutex::new(DocumentCache::default()),
            }),
        }
    }
}

impl MSet {
    /// An empty match set.
    pub fn new() -> Self {
        MSet::default()
    }

    /// Number of items in the window.
    pub fn len(&self) -> usize {
        self.internal.items.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.internal.items.is_empty()
    }

    /// The items of the window, in rank order.
    pub fn items(&self) -> &[MSetItem] {
        &self.internal.items
    }

    /// The item at `index` within the window.
    pub fn get(&self, index: usize) -> Option<&MSetItem> {
        self.internal.items.get(index)
    }

    /// Iterate over the items in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, MSetItem> {
        self.internal.items.iter()
    }

    /// Rank of the first item in the full ranking.
    pub fn first_rank(&self) -> DocCount {
        self.internal.first_rank
    }

    pub fn matches_lower_bound(&self) -> DocCount {
        self.internal.matches_lower_bound
    }

    pub fn matches_estimated(&self) -> DocCount {
        self.internal.matches_estimated
    }

    pub fn matches_upper_bound(&self) -> DocCount {
        self.internal.matches_upper_bound
    }

    /// Highest weight any document could have scored.
    pub fn max_possible(&self) -> f64 {
        self.internal.max_possible
    }

    /// Highest weight a matching document actually scored.
    pub fn max_attained(&self) -> f64 {
        self.internal.max_attained
    }

    /// Multiplier from raw weight to percentage.
    pub fn percent_factor(&self) -> f64 {
        self.internal.percent_factor
    }

    /// Convert a raw weight to a percentage in `[0, 100]`.
    ///
    /// The best attained weight maps to 100 and any positive weight to at
    /// least 1.
    pub fn convert_to_percent(&self, weight: f64) -> u8 {
        weight_to_percent(weight, self.internal.percent_factor)
    }

    /// Percentage of the item at `index`.
    pub fn percent(&self, index: usize) -> Option<u8> {
        self.get(index).map(|item| self.convert_to_percent(item.weight))
    }

    /// Statistics for every query term.
    pub fn term_stats(&self) -> &BTreeMap<String, TermStats> {
        &self.internal.term_stats
    }

    /// Number of documents indexed by a query term.
    pub fn termfreq(&self, term: &str) -> Result<DocCount> {
        self.term_stat(term).map(|stats| stats.term_freq)
    }

    /// Maximum weight a query term can contribute.
    pub fn term_weight(&self, term: &str) -> Result<f64> {
        self.term_stat(term).map(|stats| stats.term_weight)
    }

    fn term_stat(&self, term: &str) -> Result<&TermStats> {
        self.internal
            .term_stats
            .get(term)
            .ok_or_else(|| EnquireError::not_found(format!("term {term:?} is not in the query")))
    }

    /// Mark the documents at `range` as wanted and send prefetch hints.
    ///
    /// Does not block; the documents are read by the next
    /// [`MSet::document`] call.
    pub fn fetch(&self, range: Range<usize>) {
        let end = range.end.min(self.len());
        let mut cache = self.internal.cache.lock();
        for index in range.start..end {
            if cache.request(index)
                && let Some(source) = &self.internal.source
            {
                source.request_document(self.internal.items[index].doc_id);
            }
        }
    }

    /// Mark every document of the window as wanted.
    pub fn fetch_all(&self) {
        self.fetch(0..self.len());
    }

    /// Read the pending documents in `[first, last)` in one batch.
    ///
    /// Returns the number of documents added to the cache. Documents that
    /// fail to load stay uncached; reading them with [`MSet::document`]
    /// reports the failure.
    pub fn fetch_items(&self, first: usize, last: usize) -> usize {
        let indices = self
            .internal
            .cache
            .lock()
            .take_pending(first, last.min(self.len()));
        let (loaded, failures) = self.load(indices);
        for (index, error) in failures {
            trace!("deferred failure for rank {index}: {error}");
        }
        loaded
    }

    /// The document at `index` within the window.
    ///
    /// Fails with `NotFound` if the index is outside the window or the
    /// backend no longer has the document.
    pub fn document(&self, index: usize) -> Result<Arc<Document>> {
        if index >= self.len() {
            return Err(EnquireError::not_found(format!(
                "rank index {index} is outside the match set window of {}",
                self.len()
            )));
        }

        let indices = {
            let mut cache = self.internal.cache.lock();
            if let Some(doc) = cache.get(index) {
                trace!("cache hit for rank {index}");
                return Ok(doc);
            }
            cache.request(index);
            let (first, last) = cache.pending_envelope().unwrap_or((index, index + 1));
            cache.take_pending(first, last.min(self.len()))
        };
        let (_, failures) = self.load(indices);

        if let Some(doc) = self.internal.cache.lock().get(index) {
            return Ok(doc);
        }
        match failures.into_iter().find(|(failed, _)| *failed == index) {
            Some((_, error)) => Err(error),
            None => Err(EnquireError::not_found(format!(
                "document at rank {index} was not loaded"
            ))),
        }
    }

    /// Number of documents currently cached.
    pub fn cached_documents(&self) -> usize {
        self.internal.cache.lock().cached()
    }

    /// Read the documents at `indices`, which the caller has taken out of
    /// the pending set. The backend is called without the cache lock held.
    fn load(&self, indices: Vec<usize>) -> (usize, Vec<(usize, EnquireError)>) {
        if indices.is_empty() {
            return (0, Vec::new());
        }

        let Some(source) = &self.internal.source else {
            let failures = indices
                .into_iter()
                .map(|index| (index, EnquireError::other("match set has no document source")))
                .collect();
            return (0, failures);
        };

        let doc_ids: Vec<_> = indices
            .iter()
            .map(|index| self.internal.items[*index].doc_id)
            .collect();
        trace!(
            "fetching {} documents for ranks {:?}..={:?}",
            doc_ids.len(),
            indices.first(),
            indices.last()
        );
        let results = source.fetch_documents(&doc_ids);

        let mut cache = self.internal.cache.lock();
        let mut loaded = 0;
        let mut failures = Vec::new();
        for (index, result) in indices.into_iter().zip(results) {
            match result {
                Ok(doc) => {
                    cache.insert(index, doc);
                    loaded += 1;
                }
                Err(e) => failures.push((index, e)),
            }
        }
        (loaded, failures)
    }

    /// Get a human-readable description of this match set.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl<'a> IntoIterator for &'a MSet {
    type Item = &'a MSetItem;
    type IntoIter = std::slice::Iter<'a, MSetItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let internal = &self.internal;
        write!(
            f,
            "MSet(first_rank={}, items={}, matches=[{}, {}, {}], max_possible={}, max_attained={}, percent_factor={})",
            internal.first_rank,
            internal.items.len(),
            internal.matches_lower_bound,
            internal.matches_estimated,
            internal.matches_upper_bound,
            internal.max_possible,
            internal.max_attained,
            internal.percent_factor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    use crate::database::{Database, MemoryDatabase, Posting};
    use crate::document::FieldValue;
    use crate::types::{DocId, TermCount, ValueSlot};

    fn corpus(n: usize) -> MemoryDatabase {
        MemoryDatabase::from_documents(
            (0..n).map(|i| Document::builder().data(format!("doc{}", i + 1)).build()),
        )
    }

    fn setup(weights: &[f64]) -> (Arc<MemoryDatabase>, MSet) {
        let db = Arc::new(corpus(weights.len()));
        let mset = build_over(db.clone(), weights);
        (db, mset)
    }

    fn build_over(db: Arc<dyn Database>, weights: &[f64]) -> MSet {
        let items: Vec<MSetItem> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| MSetItem::new(i as u64 + 1, *w))
            .collect();
        let builder = MSetBuilder {
            max_attained: weights.iter().cloned().fold(0.0, f64::max),
            max_possible: 10.0,
            matches_lower_bound: items.len() as DocCount,
            matches_estimated: items.len() as DocCount,
            matches_upper_bound: items.len() as DocCount,
            items,
            ..Default::default()
        };
        builder.build(Some(Arc::new(ShardSet::single(db))))
    }

    /// Backend that checks, on every batch read, whether the match set it
    /// serves could take its cache lock.
    struct LockCheckingDatabase {
        inner: MemoryDatabase,
        mset: OnceLock<MSet>,
        lock_free: AtomicBool,
    }

    impl fmt::Debug for LockCheckingDatabase {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("LockCheckingDatabase").finish_non_exhaustive()
        }
    }

    impl Database for LockCheckingDatabase {
        fn doc_count(&self) -> Result<DocCount> {
            self.inner.doc_count()
        }
        fn total_length(&self) -> Result<u64> {
            self.inner.total_length()
        }
        fn term_freq(&self, term: &str) -> Result<DocCount> {
            self.inner.term_freq(term)
        }
        fn postings(&self, term: &str) -> Result<Vec<Posting>> {
            self.inner.postings(term)
        }
        fn doc_length(&self, doc_id: DocId) -> Result<TermCount> {
            self.inner.doc_length(doc_id)
        }
        fn term_list(&self, doc_id: DocId) -> Result<Vec<(String, TermCount)>> {
            self.inner.term_list(doc_id)
        }
        fn value(&self, doc_id: DocId, slot: ValueSlot) -> Result<Option<FieldValue>> {
            self.inner.value(doc_id, slot)
        }
        fn fetch_document(&self, doc_id: DocId) -> Result<Arc<Document>> {
            self.inner.fetch_document(doc_id)
        }
        fn fetch_documents(&self, doc_ids: &[DocId]) -> Vec<Result<Arc<Document>>> {
            if let Some(mset) = self.mset.get() {
                let free = mset.internal.cache.try_lock().is_some();
                self.lock_free.fetch_and(free, AtomicOrdering::SeqCst);
            }
            self.inner.fetch_documents(doc_ids)
        }
    }

    #[test]
    fn test_backend_is_read_without_the_cache_lock() {
        let db = Arc::new(LockCheckingDatabase {
            inner: corpus(3),
            mset: OnceLock::new(),
            lock_free: AtomicBool::new(true),
        });
        let mset = build_over(db.clone(), &[3.0, 2.0, 1.0]);
        assert!(db.mset.set(mset.clone()).is_ok());

        assert_eq!(mset.document(0).unwrap().data(), "doc1");
        mset.fetch(1..3);
        assert_eq!(mset.fetch_items(0, 3), 2);
        assert_eq!(mset.cached_documents(), 3);
        assert!(db.lock_free.load(AtomicOrdering::SeqCst));
    }

    #[test]
    fn test_concurrent_readers_share_cached_documents() {
        let (_, mset) = setup(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        mset.fetch_all();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let reader = mset.clone();
                scope.spawn(move || {
                    for index in (0..reader.len()).rev() {
                        let doc = reader.document(index).unwrap();
                        assert_eq!(doc.data(), format!("doc{}", index + 1));
                    }
                });
            }
        });
        assert_eq!(mset.cached_documents(), 5);
        for index in 0..mset.len() {
            let again = mset.clone().document(index).unwrap();
            assert!(Arc::ptr_eq(&again, &mset.document(index).unwrap()));
        }
    }

    #[test]
    fn test_percentages() {
        let (_, mset) = setup(&[9.0, 6.0, 3.0]);
        assert!((mset.percent_factor() - 100.0 / 9.0).abs() < 1e-12);
        let percents: Vec<u8> = (0..3).filter_map(|i| mset.percent(i)).collect();
        assert_eq!(percents, vec![100, 67, 33]);
        assert_eq!(mset.convert_to_percent(0.0001), 1);
        assert_eq!(mset.convert_to_percent(-2.0), 0);
        assert_eq!(mset.convert_to_percent(20.0), 100);
        assert_eq!(MSet::new().convert_to_percent(5.0), 0);
    }

    #[test]
    fn test_document_is_fetched_once() {
        let (db, mset) = setup(&[3.0, 2.0]);
        let first = mset.document(1).unwrap();
        let second = mset.document(1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.data(), "doc2");
        assert_eq!(db.stats().fetch_calls, 1);
    }

    #[test]
    fn test_prefetched_documents_share_one_batch() {
        let (db, mset) = setup(&[4.0, 3.0, 2.0, 1.0]);
        mset.fetch(1..10);
        assert_eq!(db.stats().requests, 3);
        assert_eq!(db.stats().fetch_calls, 0);

        mset.document(0).unwrap();
        assert_eq!(db.stats().fetch_calls, 1);
        assert_eq!(db.stats().documents_fetched, 4);
        assert_eq!(mset.cached_documents(), 4);

        mset.document(3).unwrap();
        assert_eq!(db.stats().fetch_calls, 1);
    }

    #[test]
    fn test_fetch_items_without_pending_is_noop() {
        let (db, mset) = setup(&[1.0]);
        assert_eq!(mset.fetch_items(0, 1), 0);
        assert_eq!(db.stats().fetch_calls, 0);
        mset.fetch(0..1);
        assert_eq!(mset.fetch_items(0, 1), 1);
        assert_eq!(mset.fetch_items(0, 1), 0);
    }

    #[test]
    fn test_missing_document_only_fails_its_index() {
        let (db, mset) = setup(&[3.0, 2.0, 1.0]);
        db.delete_document(2).unwrap();
        mset.fetch_all();

        assert!(mset.document(1).unwrap_err().is_not_found());
        assert_eq!(mset.document(0).unwrap().data(), "doc1");
        assert_eq!(mset.document(2).unwrap().data(), "doc3");
        assert!(mset.document(7).unwrap_err().is_not_found());
    }

    #[test]
    fn test_clone_shares_cache_and_equality_ignores_it() {
        let (db, mset) = setup(&[2.0, 1.0]);
        let copy = mset.clone();
        copy.document(0).unwrap();
        mset.document(0).unwrap();
        assert_eq!(db.stats().fetch_calls, 1);

        let (_, fresh) = setup(&[2.0, 1.0]);
        assert_eq!(fresh, mset);
    }

    #[test]
    fn test_term_stats_lookup() {
        let mut term_stats = BTreeMap::new();
        term_stats.insert(
            "rust".to_string(),
            TermStats {
                term_freq: 4,
                term_weight: 1.5,
            },
        );
        let mset = MSetBuilder {
            term_stats,
            ..Default::default()
        }
        .build(None);
        assert_eq!(mset.termfreq("rust").unwrap(), 4);
        assert_eq!(mset.term_weight("rust").unwrap(), 1.5);
        assert!(mset.termfreq("go").unwrap_err().is_not_found());
        assert!(mset.description().starts_with("MSet(first_rank=0, items=0"));
    }
}
