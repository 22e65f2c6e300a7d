//! Handling of recoverable sub-evaluation failures.
//!
//! When one shard of a sharded evaluation fails, the session hands the
//! error to its [`ErrorHandler`]. Returning `true` suppresses the failure:
//! the shard is skipped and evaluation carries on with degraded bounds.
//! Returning `false` makes the failure fatal for that call.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;

use crate::error::EnquireError;

/// Callback for recoverable sub-evaluation failures.
pub trait ErrorHandler: Send + Sync + Debug {
    /// Handle `error` raised while running `operation`.
    ///
    /// Return `true` to suppress the error and continue.
    fn handle(&self, error: &EnquireError, operation: &str) -> bool;
}

/// Logs every failure and suppresses up to a limit.
#[derive(Debug)]
pub struct LoggingErrorHandler {
    max_suppressed: usize,
    seen: AtomicUsize,
}

impl LoggingErrorHandler {
    /// Suppress every failure.
    pub fn new() -> Self {
        LoggingErrorHandler::with_limit(usize::MAX)
    }

    /// Suppress at most `max_suppressed` failures; later ones are fatal.
    pub fn with_limit(max_suppressed: usize) -> Self {
        LoggingErrorHandler {
            max_suppressed,
            seen: AtomicUsize::new(0),
        }
    }

    /// Number of failures handled so far.
    pub fn handled(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl Default for LoggingErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, error: &EnquireError, operation: &str) -> bool {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst);
        let suppress = seen < self.max_suppressed;
        if suppress {
            warn!("{operation}: suppressing failure: {error}");
        } else {
            warn!("{operation}: failure limit reached, propagating: {error}");
        }
        suppress
    }
}
