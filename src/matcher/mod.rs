//! Match evaluation: turning a query into scored candidates.
//!
//! A [`MatchEvaluator`] produces the raw candidate stream for a query in
//! relevance order. The session then runs it through the collector, which
//! applies deciders, the spy, cutoffs, collapsing, sorting and the result
//! window.

pub(crate) mod collector;
pub mod local;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::warn;

use crate::decider::MatchDecider;
use crate::error::{EnquireError, Result};
use crate::error_handler::ErrorHandler;
use crate::mset::TermStats;
use crate::query::Query;
use crate::rset::RSet;
use crate::types::{DocId, TermCount, ValueSlot};
use crate::weight::Weight;

pub(crate) use collector::{CollectorSettings, MatchCollector};
pub use local::LocalMatcher;

/// Everything an evaluator needs to score one query.
pub struct MatchRequest<'a> {
    /// The query to evaluate.
    pub query: &'a Query,
    /// Query length used for length normalization.
    pub query_length: TermCount,
    /// Relevance feedback, possibly empty.
    pub rset: &'a RSet,
    /// Weighting scheme.
    pub weight: &'a dyn Weight,
    /// Slot whose value becomes each candidate's collapse value.
    pub collapse_key: Option<ValueSlot>,
    /// Slot whose value becomes each candidate's sort value.
    pub sort_key: Option<ValueSlot>,
    /// Handler for shard failures. Without one, failures are fatal.
    pub error_handler: Option<&'a dyn ErrorHandler>,
    /// Deciders registered on the session, by name.
    pub deciders: &'a BTreeMap<String, Arc<dyn MatchDecider>>,
}

/// A scored document produced by an evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Global document id.
    pub doc_id: DocId,
    /// Raw weight.
    pub weight: f64,
    /// Collapse key value; empty when the document has none.
    pub collapse_value: Vec<u8>,
    /// Sort key value; empty when the document has none.
    pub sort_value: Vec<u8>,
}

impl Candidate {
    /// A candidate with no collapse or sort value.
    pub fn new(doc_id: DocId, weight: f64) -> Self {
        Candidate {
            doc_id,
            weight,
            collapse_value: Vec::new(),
            sort_value: Vec::new(),
        }
    }
}

/// The output of an evaluator.
#[derive(Debug, Clone, Default)]
pub struct MatchCandidates {
    /// Candidates in relevance order: weight descending, then doc id.
    pub candidates: Vec<Candidate>,
    /// Highest weight any document could score.
    pub max_possible: f64,
    /// Statistics for every query term.
    pub term_stats: BTreeMap<String, TermStats>,
    /// Shards whose failure was suppressed by the error handler.
    pub skipped_shards: usize,
}

impl MatchCandidates {
    /// Put the candidates in relevance order.
    pub fn sort_by_relevance(&mut self) {
        self.candidates.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
    }
}

/// Trait for query evaluators.
pub trait MatchEvaluator: Send + Sync + Debug {
    /// Score every document matching `request.query`.
    fn evaluate(&self, request: &MatchRequest<'_>) -> Result<MatchCandidates>;
}

/// Decide what happens to a failure in `shard`.
///
/// Returns `Ok(())` when the error handler suppressed it, the tagged error
/// otherwise.
pub(crate) fn route_shard_failure(
    handler: Option<&dyn ErrorHandler>,
    operation: &str,
    shard: usize,
    error: EnquireError,
) -> Result<()> {
    let error = error.in_shard(operation, shard);
    match handler {
        Some(handler) if handler.handle(&error, operation) => {
            warn!("{operation}: skipping shard {shard}");
            Ok(())
        }
        _ => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::LoggingErrorHandler;

    #[test]
    fn test_sort_by_relevance() {
        let mut out = MatchCandidates {
            candidates: vec![
                Candidate::new(4, 1.0),
                Candidate::new(3, 2.0),
                Candidate::new(1, 1.0),
            ],
            ..Default::default()
        };
        out.sort_by_relevance();
        let ids: Vec<DocId> = out.candidates.iter().map(|c| c.doc_id).collect();
        assert_eq!(ids, vec![3, 1, 4]);
    }

    #[test]
    fn test_route_shard_failure() {
        let error = EnquireError::storage("offline");
        let routed = route_shard_failure(None, "get_mset", 1, error).unwrap_err();
        assert!(routed.is_sub_evaluation());

        let handler = LoggingErrorHandler::new();
        assert!(route_shard_failure(Some(&handler), "get_mset", 1, EnquireError::storage("x")).is_ok());
        assert_eq!(handler.handled(), 1);

        let strict = LoggingErrorHandler::with_limit(0);
        assert!(route_shard_failure(Some(&strict), "get_mset", 0, EnquireError::storage("x")).is_err());
    }
}
