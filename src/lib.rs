//! # Enquire
//!
//! Result assembly and ranking for full-text search.
//!
//! ## Features
//!
//! - Ranked match sets with collapsing, cutoffs and value sorting
//! - Percentages where the best match is always 100%
//! - Lazy, batched document fetching behind cheap shared handles
//! - Term expansion from relevance feedback
//! - Sharded evaluation with pluggable error handling
//! - BM25 scoring

pub mod cli;
pub mod database;
pub mod decider;
pub mod document;
pub mod enquire;
pub mod error;
pub mod error_handler;
pub mod eset;
pub mod expand;
pub mod matcher;
pub mod mset;
pub mod query;
pub mod rset;
pub mod types;
pub mod weight;

pub mod prelude {
    pub use crate::database::{Database, MemoryDatabase, ShardSet};
    pub use crate::decider::{ExpandDecider, MatchDecider, MatchSpy};
    pub use crate::document::{Document, FieldValue};
    pub use crate::enquire::{DocIdOrder, Enquire, EnquireConfig, ExpandFlags, SortBy};
    pub use crate::error::{EnquireError, Result};
    pub use crate::error_handler::{ErrorHandler, LoggingErrorHandler};
    pub use crate::eset::{ESet, ESetItem};
    pub use crate::mset::{MSet, MSetItem};
    pub use crate::query::Query;
    pub use crate::rset::RSet;
    pub use crate::weight::{Bm25Weight, BoolWeight, Weight};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
