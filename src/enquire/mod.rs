//! Query sessions.
//!
//! An [`Enquire`] holds a query and its ranking configuration and drives
//! evaluation: [`Enquire::get_mset`] produces a ranked window of documents,
//! [`Enquire::get_eset`] suggests expansion terms from relevant documents.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use enquire::database::MemoryDatabase;
//! use enquire::document::Document;
//! use enquire::enquire::Enquire;
//! use enquire::query::Query;
//!
//! let db = MemoryDatabase::new();
//! db.add_document(Document::builder().text("fast search in rust").build());
//! db.add_document(Document::builder().text("slow search").build());
//!
//! let mut enquire = Enquire::new(Arc::new(db));
//! enquire.set_query(Query::term("rust"), 0);
//! let mset = enquire.get_mset(0, 10, 0, None, None, None).unwrap();
//! assert_eq!(mset.len(), 1);
//! assert_eq!(mset.percent(0), Some(100));
//! ```

pub mod config;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::database::{Database, ShardSet};
use crate::decider::{ExpandDecider, MatchDecider, MatchSpy};
use crate::document::Document;
use crate::error::{EnquireError, Result};
use crate::error_handler::ErrorHandler;
use crate::eset::{ESet, ESetBuilder};
use crate::expand::{ExpandEvaluator, ExpandRequest, LocalExpander};
use crate::matcher::{CollectorSettings, LocalMatcher, MatchCollector, MatchEvaluator, MatchRequest};
use crate::mset::{MSet, MSetItem};
use crate::query::Query;
use crate::rset::RSet;
use crate::types::{DocId, TermCount, ValueSlot};
use crate::weight::{Bm25Weight, Weight};

pub use config::{DocIdOrder, EnquireConfig, ExpandFlags, SortBy, SortSettings};

/// A query session over one or more databases.
pub struct Enquire {
    shards: Arc<ShardSet>,
    query: Option<Query>,
    query_length: TermCount,
    config: EnquireConfig,
    weight: Box<dyn Weight>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    evaluator: Arc<dyn MatchEvaluator>,
    expander: Arc<dyn ExpandEvaluator>,
    deciders: BTreeMap<String, Arc<dyn MatchDecider>>,
}

impl Enquire {
    /// Create a session over a single database.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Enquire::with_shards(ShardSet::single(db))
    }

    /// Create a session searching several shards together.
    pub fn with_shards(shards: ShardSet) -> Self {
        let shards = Arc::new(shards);
        Enquire {
            evaluator: Arc::new(LocalMatcher::new(Arc::clone(&shards))),
            expander: Arc::new(LocalExpander::new(Arc::clone(&shards))),
            shards,
            query: None,
            query_length: 0,
            config: EnquireConfig::default(),
            weight: Box::new(Bm25Weight::new()),
            error_handler: None,
            deciders: BTreeMap::new(),
        }
    }

    /// The shards this session reads from.
    pub fn shards(&self) -> &Arc<ShardSet> {
        &self.shards
    }

    /// Replace the evaluator producing match candidates.
    pub fn set_match_evaluator(&mut self, evaluator: Arc<dyn MatchEvaluator>) {
        self.evaluator = evaluator;
    }

    /// Replace the evaluator producing expansion candidates.
    pub fn set_expand_evaluator(&mut self, expander: Arc<dyn ExpandEvaluator>) {
        self.expander = expander;
    }

    /// Set the query. A `query_length` of 0 means the query's own length.
    ///
    /// Nothing is evaluated until [`Enquire::get_mset`] is called.
    pub fn set_query(&mut self, query: Query, query_length: TermCount) {
        self.query_length = if query_length == 0 {
            query.length()
        } else {
            query_length
        };
        self.query = Some(query);
    }

    /// The current query.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// The query length used for normalization.
    pub fn query_length(&self) -> TermCount {
        self.query_length
    }

    /// The current configuration.
    pub fn config(&self) -> &EnquireConfig {
        &self.config
    }

    /// Replace the whole configuration. Rejected configurations leave the
    /// session unchanged.
    pub fn set_config(&mut self, config: EnquireConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Collapse documents sharing the value in `slot`; `None` disables.
    pub fn set_collapse_key(&mut self, slot: Option<ValueSlot>) {
        self.config.collapse_key = slot;
    }

    pub fn set_docid_order(&mut self, order: DocIdOrder) {
        self.config.docid_order = order;
    }

    /// Set the percentage and weight cutoffs. 0 disables either.
    pub fn set_cutoff(&mut self, percent_cutoff: u8, weight_cutoff: f64) -> Result<()> {
        config::validate_percent_cutoff(percent_cutoff)?;
        config::validate_weight_cutoff(weight_cutoff)?;
        self.config.percent_cutoff = percent_cutoff;
        self.config.weight_cutoff = weight_cutoff;
        Ok(())
    }

    pub fn set_sort_by_relevance(&mut self) {
        self.config.sort = SortSettings::relevance();
    }

    pub fn set_sort_by_value(&mut self, slot: ValueSlot, ascending: bool) {
        self.config.sort = SortSettings::by_value(slot, ascending);
    }

    pub fn set_sort_by_value_then_relevance(&mut self, slot: ValueSlot, ascending: bool) {
        self.config.sort = SortSettings::by_value_then_relevance(slot, ascending);
    }

    pub fn set_sort_by_relevance_then_value(&mut self, slot: ValueSlot, ascending: bool) {
        self.config.sort = SortSettings::by_relevance_then_value(slot, ascending);
    }

    /// Use a custom weighting scheme instead of BM25.
    pub fn set_weighting_scheme(&mut self, weight: Box<dyn Weight>) {
        self.weight = weight;
    }

    /// The weighting scheme in use.
    pub fn weighting_scheme(&self) -> &dyn Weight {
        self.weight.as_ref()
    }

    /// Route shard failures through `handler`; `None` makes them fatal.
    pub fn set_error_handler(&mut self, handler: Option<Arc<dyn ErrorHandler>>) {
        self.error_handler = handler;
    }

    /// Register a decider under `name` so evaluators can refer to it.
    /// Passing `None` removes the registration.
    pub fn register_match_decider<S: Into<String>>(
        &mut self,
        name: S,
        decider: Option<Arc<dyn MatchDecider>>,
    ) {
        let name = name.into();
        match decider {
            Some(decider) => {
                self.deciders.insert(name, decider);
            }
            None => {
                self.deciders.remove(&name);
            }
        }
    }

    /// The decider registered under `name`.
    pub fn registered_match_decider(&self, name: &str) -> Option<&Arc<dyn MatchDecider>> {
        self.deciders.get(name)
    }

    fn current_query(&self) -> Result<&Query> {
        self.query
            .as_ref()
            .ok_or_else(|| EnquireError::invalid_argument("no query has been set"))
    }

    /// Get the window `[first, first + max_items)` of the ranking.
    ///
    /// At least `check_at_least` candidates are assessed before the match
    /// counts are estimated. `decider` filters candidates; `spy` observes
    /// every examined candidate whether or not it is accepted.
    pub fn get_mset(
        &self,
        first: usize,
        max_items: usize,
        check_at_least: usize,
        rset: Option<&RSet>,
        decider: Option<&dyn MatchDecider>,
        spy: Option<&mut dyn MatchSpy>,
    ) -> Result<MSet> {
        let query = self.current_query()?;
        if first.checked_add(max_items).is_none() {
            return Err(EnquireError::invalid_argument(format!(
                "window [{first}, {first} + {max_items}) overflows"
            )));
        }

        let empty = RSet::new();
        let request = MatchRequest {
            query,
            query_length: self.query_length,
            rset: rset.unwrap_or(&empty),
            weight: self.weight.as_ref(),
            collapse_key: self.config.collapse_key,
            sort_key: self.config.sort.active_slot(),
            error_handler: self.error_handler.as_deref(),
            deciders: &self.deciders,
        };
        let candidates = self.evaluator.evaluate(&request)?;

        let settings = CollectorSettings {
            first,
            max_items,
            check_at_least,
            percent_cutoff: self.config.percent_cutoff,
            weight_cutoff: self.config.weight_cutoff,
            collapse: self.config.collapse_key.is_some(),
            sort: self.config.sort,
            docid_order: self.config.docid_order,
        };
        let builder = MatchCollector::new(settings, &self.shards)
            .with_decider(decider)
            .with_spy(spy)
            .collect(candidates)?;
        let mset = builder.build(Some(Arc::clone(&self.shards)));

        debug!("get_mset {query}: {mset}");
        Ok(mset)
    }

    /// Suggest up to `max_items` terms from the documents in `rset`.
    ///
    /// `k` controls how much within-document frequency counts. Terms
    /// rejected by `decider` count neither against `max_items` nor towards
    /// the bound.
    pub fn get_eset(
        &self,
        max_items: usize,
        rset: &RSet,
        flags: ExpandFlags,
        k: f64,
        decider: Option<&dyn ExpandDecider>,
    ) -> Result<ESet> {
        if rset.is_empty() {
            return Err(EnquireError::invalid_argument(
                "get_eset needs a non-empty relevance set",
            ));
        }
        if k.is_nan() || k < 0.0 {
            return Err(EnquireError::invalid_argument(format!(
                "k must be >= 0, got {k}"
            )));
        }

        let request = ExpandRequest {
            rset,
            k,
            flags,
            error_handler: self.error_handler.as_deref(),
        };
        let candidates = self.expander.expand(&request)?;

        let mut builder = ESetBuilder::new(max_items);
        for candidate in candidates {
            if !flags.include_query_terms
                && let Some(query) = &self.query
                && query.contains_term(&candidate.term)
            {
                continue;
            }
            if let Some(decider) = decider
                && !decider.accept(&candidate.term)
            {
                continue;
            }
            if candidate.weight > 0.0 {
                builder.offer(&candidate.term, candidate.weight);
            }
        }
        let eset = builder.build();

        debug!("get_eset over {} documents: {eset}", rset.len());
        Ok(eset)
    }

    /// The query terms indexing `doc_id`, in query order.
    pub fn get_matching_terms(&self, doc_id: DocId) -> Result<Vec<String>> {
        let (shard, local) = self.shards.to_local(doc_id)?;
        let terms = self.shards.shards()[shard].term_list(local)?;
        let Some(query) = &self.query else {
            return Ok(Vec::new());
        };
        Ok(query
            .terms()
            .iter()
            .filter(|qt| {
                terms
                    .binary_search_by(|(t, _)| t.as_str().cmp(&qt.term))
                    .is_ok()
            })
            .map(|qt| qt.term.clone())
            .collect())
    }

    /// The query terms indexing the document at `rank` of `mset`.
    ///
    /// `rank` counts from the top of the full ranking, so it must lie in
    /// `[first_rank, first_rank + len)`.
    pub fn get_matching_terms_at(&self, mset: &MSet, rank: usize) -> Result<Vec<String>> {
        let item = usize::try_from(mset.first_rank())
            .ok()
            .and_then(|first| rank.checked_sub(first))
            .and_then(|index| mset.get(index))
            .ok_or_else(|| {
                EnquireError::not_found(format!("rank {rank} is not in the match set"))
            })?;
        self.get_matching_terms(item.doc_id)
    }

    /// Hint that the document of `item` will be read soon. Does not block.
    pub fn request_doc(&self, item: &MSetItem) {
        self.shards.request_document(item.doc_id);
    }

    /// Read the document of `item`.
    pub fn read_doc(&self, item: &MSetItem) -> Result<Arc<Document>> {
        self.shards.fetch_document(item.doc_id)
    }

    /// Get a human-readable description of this session.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Enquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = match &self.query {
            Some(query) => query.to_string(),
            None => "None".to_string(),
        };
        write!(
            f,
            "Enquire(query={query}, weight={}, shards={}, collapse_key={:?}, sort={:?}, percent_cutoff={}, weight_cutoff={})",
            self.weight.name(),
            self.shards.len(),
            self.config.collapse_key,
            self.config.sort.by,
            self.config.percent_cutoff,
            self.config.weight_cutoff
        )
    }
}

impl fmt::Debug for Enquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enquire")
            .field("query", &self.query)
            .field("query_length", &self.query_length)
            .field("config", &self.config)
            .field("weight", &self.weight)
            .field("shards", &self.shards.len())
            .field("deciders", &self.deciders.keys().collect::<Vec<_>>())
            .finish()
    }
}
