//! Caller-supplied predicates and observers.
//!
//! - [`MatchDecider`] filters candidate documents without changing their
//!   weight. Rejected documents are not matches.
//! - [`MatchSpy`] observes every examined candidate, accepted or not, e.g.
//!   to count facet values.
//! - [`ExpandDecider`] filters candidate expansion terms.
//!
//! Plain closures implement the decider traits:
//!
//! ```
//! use enquire::decider::{ExpandDecider, MatchDecider};
//! use enquire::document::Document;
//!
//! let only_with_data = |doc: &Document| !doc.data().is_empty();
//! assert!(!MatchDecider::accept(&only_with_data, &Document::new()));
//!
//! let no_digits = |term: &str| !term.chars().any(|c| c.is_ascii_digit());
//! assert!(ExpandDecider::accept(&no_digits, "rust"));
//! ```

use std::collections::HashSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::{Document, FieldValue};
use crate::types::{DocCount, ValueSlot};

/// Decides whether a candidate document may appear in a match set.
pub trait MatchDecider: Send + Sync {
    /// Return `true` to keep the document.
    fn accept(&self, doc: &Document) -> bool;
}

impl<F> MatchDecider for F
where
    F: Fn(&Document) -> bool + Send + Sync,
{
    fn accept(&self, doc: &Document) -> bool {
        self(doc)
    }
}

/// Observes every candidate examined while building a match set.
pub trait MatchSpy: Send {
    /// Called once per examined candidate with its raw weight.
    fn observe(&mut self, doc: &Document, weight: f64);
}

/// Decides whether a term may be suggested by an expand set.
pub trait ExpandDecider: Send + Sync {
    /// Return `true` to keep the term.
    fn accept(&self, term: &str) -> bool;
}

impl<F> ExpandDecider for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, term: &str) -> bool {
        self(term)
    }
}

/// Accepts documents whose value in a slot is in (or not in) a set.
#[derive(Debug, Clone)]
pub struct ValueSetMatchDecider {
    slot: ValueSlot,
    values: HashSet<Vec<u8>>,
    inclusive: bool,
}

impl ValueSetMatchDecider {
    /// Create a decider. With `inclusive` documents must have one of the
    /// values; otherwise they must not.
    pub fn new(slot: ValueSlot, inclusive: bool) -> Self {
        ValueSetMatchDecider {
            slot,
            values: HashSet::new(),
            inclusive,
        }
    }

    /// Add a value (compared by its key bytes).
    pub fn add_value<V: Into<FieldValue>>(&mut self, value: V) {
        self.values.insert(value.into().to_key_bytes());
    }

    /// Builder form of [`ValueSetMatchDecider::add_value`].
    pub fn with_value<V: Into<FieldValue>>(mut self, value: V) -> Self {
        self.add_value(value);
        self
    }
}

impl MatchDecider for ValueSetMatchDecider {
    fn accept(&self, doc: &Document) -> bool {
        self.values.contains(&doc.value_key(self.slot)) == self.inclusive
    }
}

/// One entry of [`ValueCountMatchSpy::top_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    /// The value, rendered as a string.
    pub value: String,
    /// Number of examined documents carrying it.
    pub count: DocCount,
}

/// Counts the values of a slot across examined documents (facet counts).
#[derive(Debug, Clone)]
pub struct ValueCountMatchSpy {
    slot: ValueSlot,
    counts: AHashMap<String, DocCount>,
    total: DocCount,
}

impl ValueCountMatchSpy {
    /// Create a spy counting values of `slot`.
    pub fn new(slot: ValueSlot) -> Self {
        ValueCountMatchSpy {
            slot,
            counts: AHashMap::new(),
            total: 0,
        }
    }

    /// Number of documents observed.
    pub fn total(&self) -> DocCount {
        self.total
    }

    /// Count for one value.
    pub fn count(&self, value: &str) -> DocCount {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// The `limit` most frequent values, ties by value.
    pub fn top_values(&self, limit: usize) -> Vec<ValueCount> {
        let mut values: Vec<ValueCount> = self
            .counts
            .iter()
            .map(|(value, count)| ValueCount {
                value: value.clone(),
                count: *count,
            })
            .collect();
        values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        values.truncate(limit);
        values
    }
}

impl MatchSpy for ValueCountMatchSpy {
    fn observe(&mut self, doc: &Document, _weight: f64) {
        self.total += 1;
        if let Some(value) = doc.value(self.slot)
            && !value.is_null()
        {
            *self.counts.entry(value.display_string()).or_insert(0) += 1;
        }
    }
}

/// Rejects terms starting with a given prefix.
#[derive(Debug, Clone)]
pub struct PrefixExpandDecider {
    prefix: String,
}

impl PrefixExpandDecider {
    /// Create a decider rejecting terms that start with `prefix`.
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        PrefixExpandDecider {
            prefix: prefix.into(),
        }
    }
}

impl ExpandDecider for PrefixExpandDecider {
    fn accept(&self, term: &str) -> bool {
        !term.starts_with(&self.prefix)
    }
}
