//! Expand sets: ranked term suggestions derived from a relevance set.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::TermCount;

/// A suggested expansion term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ESetItem {
    /// Expansion weight of the term.
    pub weight: f64,
    /// The term.
    pub term: String,
}

#[derive(Debug, Default, PartialEq)]
struct ESetInternal {
    items: Vec<ESetItem>,
    bound: TermCount,
}

/// A ranked list of expansion terms.
///
/// Items are in descending weight, ties by ascending term. [`ESet::bound`]
/// is a lower estimate of how many terms qualified in total, so it is
/// never smaller than [`ESet::len`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ESet {
    internal: Arc<ESetInternal>,
}

impl ESet {
    /// An empty expand set.
    pub fn new() -> Self {
        ESet::default()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.internal.items.len()
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.internal.items.is_empty()
    }

    /// Number of terms that qualified, including those not returned.
    pub fn bound(&self) -> TermCount {
        self.internal.bound
    }

    /// The items in rank order.
    pub fn items(&self) -> &[ESetItem] {
        &self.internal.items
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<&ESetItem> {
        self.internal.items.get(index)
    }

    /// Iterate over the items in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ESetItem> {
        self.internal.items.iter()
    }

    /// The suggested terms in rank order.
    pub fn terms(&self) -> Vec<&str> {
        self.internal.items.iter().map(|item| item.term.as_str()).collect()
    }

    /// Get a human-readable description of this expand set.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl<'a> IntoIterator for &'a ESet {
    type Item = &'a ESetItem;
    type IntoIter = std::slice::Iter<'a, ESetItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ESet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .internal
            .items
            .iter()
            .map(|item| format!("{}:{:.4}", item.term, item.weight))
            .collect();
        write!(
            f,
            "ESet(bound={}, items=[{}])",
            self.internal.bound,
            terms.join(", ")
        )
    }
}

/// A candidate in the builder heap. The greatest entry is the worst one.
#[derive(Debug)]
struct Ranked(ESetItem);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .weight
            .total_cmp(&self.0.weight)
            .then_with(|| self.0.term.cmp(&other.0.term))
    }
}

/// Keeps the best `max_items` terms offered while counting every one.
#[derive(Debug)]
pub(crate) struct ESetBuilder {
    max_items: usize,
    heap: BinaryHeap<Ranked>,
    bound: TermCount,
}

impl ESetBuilder {
    pub(crate) fn new(max_items: usize) -> Self {
        ESetBuilder {
            max_items,
            heap: BinaryHeap::with_capacity(max_items.min(1024)),
            bound: 0,
        }
    }

    /// Offer a qualifying term.
    pub(crate) fn offer(&mut self, term: &str, weight: f64) {
        self.bound = self.bound.saturating_add(1);
        if self.max_items == 0 {
            return;
        }
        let candidate = Ranked(ESetItem {
            weight,
            term: term.to_string(),
        });
        if self.heap.len() < self.max_items {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek()
            && *worst > candidate
        {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    pub(crate) fn build(self) -> ESet {
        let mut ranked = self.heap.into_vec();
        ranked.sort();
        ESet {
            internal: Arc::new(ESetInternal {
                items: ranked.into_iter().map(|r| r.0).collect(),
                bound: self.bound,
            }),
        }
    }
}
