//! Error types for the enquire library.
//!
//! All fallible operations return [`EnquireError`] through the [`Result`]
//! alias. The variants follow the three conditions a caller has to tell
//! apart when assembling results:
//!
//! - [`EnquireError::InvalidArgument`]: a malformed window, cutoff or
//!   relevance set. Always reported synchronously, never retried.
//! - [`EnquireError::NotFound`]: a document vanished between match and
//!   fetch, or a rank/id is not part of a prior result.
//! - [`EnquireError::SubEvaluation`]: one shard of a sharded evaluation
//!   failed. These are routed through the session's error handler first.
//!
//! # Examples
//!
//! ```
//! use enquire::error::{EnquireError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(EnquireError::invalid_argument("percent cutoff must be <= 100"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for enquire operations.
#[derive(Error, Debug)]
pub enum EnquireError {
    /// I/O errors (reading document files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed parameters: window, cutoffs, slots, empty relevance sets.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A document, rank or term that is not available.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A shard (sub-database) failed while evaluating `operation`.
    #[error("Sub-evaluation of {operation} failed on shard {shard}: {message}")]
    SubEvaluation {
        /// The operation being evaluated, e.g. `get_mset`.
        operation: String,
        /// Index of the failing shard.
        shard: usize,
        /// Backend supplied description.
        message: String,
    },

    /// Storage backend errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with EnquireError.
pub type Result<T> = std::result::Result<T, EnquireError>;

impl EnquireError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        EnquireError::InvalidArgument(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        EnquireError::NotFound(msg.into())
    }

    /// Create a new sub-evaluation error.
    pub fn sub_evaluation<O: Into<String>, S: Into<String>>(
        operation: O,
        shard: usize,
        msg: S,
    ) -> Self {
        EnquireError::SubEvaluation {
            operation: operation.into(),
            shard,
            message: msg.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        EnquireError::Storage(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        EnquireError::Other(msg.into())
    }

    /// Whether this is an [`EnquireError::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, EnquireError::InvalidArgument(_))
    }

    /// Whether this is an [`EnquireError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, EnquireError::NotFound(_))
    }

    /// Whether this is an [`EnquireError::SubEvaluation`].
    pub fn is_sub_evaluation(&self) -> bool {
        matches!(self, EnquireError::SubEvaluation { .. })
    }

    /// Tag a backend failure with the shard and operation it happened in.
    ///
    /// `InvalidArgument` and `NotFound` pass through unchanged; everything
    /// else becomes a [`EnquireError::SubEvaluation`].
    pub fn in_shard(self, operation: &str, shard: usize) -> Self {
        match self {
            EnquireError::InvalidArgument(_)
            | EnquireError::NotFound(_)
            | EnquireError::SubEvaluation { .. } => self,
            other => EnquireError::sub_evaluation(operation, shard, other.to_string()),
        }
    }
}
