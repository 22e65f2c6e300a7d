//! Query representation handed to the evaluators.

#[allow(clippy::module_inception)]
pub mod query;

pub use self::query::{Query, QueryOperator, QueryTerm};
