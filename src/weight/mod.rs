//! Weighting schemes used by the local evaluator.
//!
//! A [`Weight`] turns per-term statistics into document weights. The
//! evaluator adds up `sum_part` for each matching query term plus
//! `sum_extra` once per document, and reports the sum of the `max_part`s
//! plus `max_extra` as the maximum weight any document could attain.

pub mod bm25;
pub mod bool_weight;

use std::fmt::Debug;

use crate::types::{DocCount, TermCount};

pub use bm25::Bm25Weight;
pub use bool_weight::BoolWeight;

/// Collection-wide statistics for one query term.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TermWeightStats {
    /// Number of documents in the collection.
    pub collection_size: DocCount,
    /// Average document length in the collection.
    pub average_length: f64,
    /// Number of documents the term indexes.
    pub term_freq: DocCount,
    /// Number of documents in the relevance set.
    pub rset_size: DocCount,
    /// Number of relevance-set documents the term indexes.
    pub rel_term_freq: DocCount,
    /// Within-query frequency of the term.
    pub wqf: TermCount,
    /// Length of the whole query.
    pub query_length: TermCount,
}

/// Trait for weighting schemes.
pub trait Weight: Send + Sync + Debug {
    /// Name for diagnostics.
    fn name(&self) -> &'static str;

    /// Contribution of one term to a document's weight.
    fn sum_part(&self, stats: &TermWeightStats, wdf: TermCount, doc_length: TermCount) -> f64;

    /// Upper bound of [`Weight::sum_part`] over all documents.
    fn max_part(&self, stats: &TermWeightStats) -> f64;

    /// Per-document contribution independent of the terms.
    fn sum_extra(&self, doc_length: TermCount, average_length: f64, query_length: TermCount) -> f64 {
        let _ = (doc_length, average_length, query_length);
        0.0
    }

    /// Upper bound of [`Weight::sum_extra`].
    fn max_extra(&self, average_length: f64, query_length: TermCount) -> f64 {
        let _ = (average_length, query_length);
        0.0
    }

    /// Clone this scheme.
    fn clone_box(&self) -> Box<dyn Weight>;
}

impl Clone for Box<dyn Weight> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
