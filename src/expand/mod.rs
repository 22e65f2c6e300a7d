//! Expansion: suggesting terms from a relevance set.
//!
//! An [`ExpandEvaluator`] scores the terms of the relevant documents. The
//! session filters them (decider, query terms, non-positive weights) and
//! keeps the best ones in an [`ESet`](crate::eset::ESet).

pub mod local;

use std::fmt::Debug;

use crate::enquire::config::ExpandFlags;
use crate::error::Result;
use crate::error_handler::ErrorHandler;
use crate::rset::RSet;
use crate::types::DocCount;

pub use local::LocalExpander;

/// Input to an expand evaluator.
pub struct ExpandRequest<'a> {
    /// Relevant documents; never empty.
    pub rset: &'a RSet,
    /// Strength of the within-document frequency influence.
    pub k: f64,
    /// Behavioral options.
    pub flags: ExpandFlags,
    /// Handler for shard failures. Without one, failures are fatal.
    pub error_handler: Option<&'a dyn ErrorHandler>,
}

/// A scored term from the relevant documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandCandidate {
    /// The term.
    pub term: String,
    /// Expansion weight.
    pub weight: f64,
    /// Number of relevant documents containing the term.
    pub rel_freq: DocCount,
}

/// Trait for term expansion evaluators.
pub trait ExpandEvaluator: Send + Sync + Debug {
    /// Score the terms indexing the documents of `request.rset`.
    fn expand(&self, request: &ExpandRequest<'_>) -> Result<Vec<ExpandCandidate>>;
}
