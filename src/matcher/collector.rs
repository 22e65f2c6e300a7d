//! Turning raw candidates into a match set window.
//!
//! Each candidate goes through these steps, in this order:
//!
//! 1. the match spy observes it,
//! 2. the match decider may reject it,
//! 3. weight and percent cutoffs may reject it,
//! 4. collapsing merges it with an earlier candidate of the same key.
//!
//! The survivors are sorted and sliced to the requested window. When the
//! candidates arrive in final order (relevance order with ascending doc
//! ids) collection stops as soon as enough documents are held, and the
//! match counts become estimates.

use std::cmp::Ordering;

use ahash::AHashMap;
use log::debug;

use crate::database::ShardSet;
use crate::decider::{MatchDecider, MatchSpy};
use crate::enquire::config::{DocIdOrder, SortBy, SortSettings};
use crate::error::Result;
use crate::matcher::{Candidate, MatchCandidates};
use crate::mset::{MSetBuilder, MSetItem, percent_factor, weight_to_percent};
use crate::types::DocCount;

/// Window, cutoff and ordering parameters for one collection run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CollectorSettings {
    /// 0-based rank of the first item to return.
    pub first: usize,
    /// Maximum number of items to return.
    pub max_items: usize,
    /// Minimum number of candidates to assess before stopping.
    pub check_at_least: usize,
    /// Minimum percentage a match needs.
    pub percent_cutoff: u8,
    /// Minimum weight a match needs.
    pub weight_cutoff: f64,
    /// Whether candidates with equal collapse values are merged.
    pub collapse: bool,
    /// Result ordering.
    pub sort: SortSettings,
    /// Tie-break order by document id.
    pub docid_order: DocIdOrder,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            first: 0,
            max_items: 10,
            check_at_least: 0,
            percent_cutoff: 0,
            weight_cutoff: 0.0,
            collapse: false,
            sort: SortSettings::default(),
            docid_order: DocIdOrder::Ascending,
        }
    }
}

/// Collects candidates into a match set.
pub(crate) struct MatchCollector<'a, 's> {
    settings: CollectorSettings,
    source: &'a ShardSet,
    decider: Option<&'a dyn MatchDecider>,
    spy: Option<&'s mut dyn MatchSpy>,
    items: Vec<MSetItem>,
    /// collapse key -> index into `items`
    collapsed: AHashMap<Vec<u8>, usize>,
    examined: usize,
    max_attained: f64,
}

impl<'a, 's> MatchCollector<'a, 's> {
    /// Create a collector; `source` serves documents to the decider and spy.
    pub(crate) fn new(settings: CollectorSettings, source: &'a ShardSet) -> Self {
        MatchCollector {
            settings,
            source,
            decider: None,
            spy: None,
            items: Vec::new(),
            collapsed: AHashMap::new(),
            examined: 0,
            max_attained: 0.0,
        }
    }

    /// Filter candidates through `decider`.
    pub(crate) fn with_decider(mut self, decider: Option<&'a dyn MatchDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Show every examined candidate to `spy`.
    pub(crate) fn with_spy(mut self, spy: Option<&'s mut dyn MatchSpy>) -> Self {
        self.spy = spy;
        self
    }

    fn streams_in_final_order(&self) -> bool {
        self.settings.sort.by == SortBy::Relevance
            && self.settings.docid_order != DocIdOrder::Descending
    }

    /// Run the spy and the decider. Returns whether the candidate is a match.
    fn examine(&mut self, candidate: &Candidate) -> Result<bool> {
        self.examined += 1;
        if self.decider.is_none() && self.spy.is_none() {
            return Ok(true);
        }
        let doc = self.source.fetch_document(candidate.doc_id)?;
        if let Some(spy) = self.spy.as_mut() {
            spy.observe(&doc, candidate.weight);
        }
        Ok(self.decider.is_none_or(|decider| decider.accept(&doc)))
    }

    fn passes_cutoffs(&self, weight: f64, factor: f64) -> bool {
        if self.settings.weight_cutoff > 0.0 && weight < self.settings.weight_cutoff {
            return false;
        }
        self.settings.percent_cutoff == 0
            || weight_to_percent(weight, factor) >= self.settings.percent_cutoff
    }

    /// Add a candidate that passed every filter, collapsing if enabled.
    fn admit(&mut self, candidate: Candidate) {
        let collapse = self.settings.collapse && !candidate.collapse_value.is_empty();
        if collapse && let Some(&index) = self.collapsed.get(&candidate.collapse_value) {
            let kept = &mut self.items[index];
            kept.collapse_count += 1;
            if candidate.weight > kept.weight {
                kept.weight = candidate.weight;
                kept.doc_id = candidate.doc_id;
                kept.sort_key = candidate.sort_value;
            }
            return;
        }

        if collapse {
            self.collapsed
                .insert(candidate.collapse_value.clone(), self.items.len());
        }
        self.items.push(MSetItem {
            weight: candidate.weight,
            doc_id: candidate.doc_id,
            collapse_key: candidate.collapse_value,
            collapse_count: 0,
            sort_key: candidate.sort_value,
        });
    }

    fn compare(&self, a: &MSetItem, b: &MSetItem) -> Ordering {
        let by_weight = || b.weight.total_cmp(&a.weight);
        let by_value = || {
            if self.settings.sort.ascending {
                a.sort_key.cmp(&b.sort_key)
            } else {
                b.sort_key.cmp(&a.sort_key)
            }
        };
        let primary = match self.settings.sort.by {
            SortBy::Relevance => by_weight(),
            SortBy::Value => by_value(),
            SortBy::ValueThenRelevance => by_value().then_with(by_weight),
            SortBy::RelevanceThenValue => by_weight().then_with(by_value),
        };
        primary.then_with(|| match self.settings.docid_order {
            DocIdOrder::Descending => b.doc_id.cmp(&a.doc_id),
            DocIdOrder::Ascending | DocIdOrder::DontCare => a.doc_id.cmp(&b.doc_id),
        })
    }

    /// True when every candidate is bound to become a match.
    fn unfiltered(&self) -> bool {
        self.decider.is_none()
            && self.settings.percent_cutoff == 0
            && self.settings.weight_cutoff <= 0.0
            && !self.settings.collapse
    }

    /// Collect `input` into a match set.
    pub(crate) fn collect(mut self, input: MatchCandidates) -> Result<MSetBuilder> {
        let total = input.candidates.len();
        let settings = self.settings;

        if settings.max_items == 0 && settings.check_at_least == 0 {
            let lower = if self.unfiltered() { total as DocCount } else { 0 };
            return Ok(MSetBuilder {
                term_stats: input.term_stats,
                first_rank: settings.first as DocCount,
                matches_lower_bound: lower,
                matches_estimated: total as DocCount,
                matches_upper_bound: total as DocCount,
                max_possible: input.max_possible,
                ..Default::default()
            });
        }

        let check = settings
            .check_at_least
            .max(settings.first.saturating_add(settings.max_items));
        let mut stopped_early = false;

        if self.streams_in_final_order() {
            for candidate in input.candidates {
                if self.items.len() >= check {
                    stopped_early = true;
                    break;
                }
                if !self.examine(&candidate)? {
                    continue;
                }
                self.max_attained = self.max_attained.max(candidate.weight);
                if self.passes_cutoffs(candidate.weight, percent_factor(self.max_attained)) {
                    self.admit(candidate);
                }
            }
        } else {
            let mut matches = Vec::new();
            for candidate in input.candidates {
                if self.examine(&candidate)? {
                    self.max_attained = self.max_attained.max(candidate.weight);
                    matches.push(candidate);
                }
            }
            let factor = percent_factor(self.max_attained);
            for candidate in matches {
                if self.passes_cutoffs(candidate.weight, factor) {
                    self.admit(candidate);
                }
            }
        }

        let mut items = std::mem::take(&mut self.items);
        items.sort_by(|a, b| self.compare(a, b));

        let held = items.len() as DocCount;
        let (lower, estimated, upper) = if stopped_early && self.unfiltered() {
            let total = total as DocCount;
            (total, total, total)
        } else if stopped_early {
            let remaining = (total - self.examined) as DocCount;
            let rate = held as f64 / self.examined.max(1) as f64;
            let estimated = held + (remaining as f64 * rate).round() as DocCount;
            (held, estimated.min(held + remaining), held + remaining)
        } else {
            (held, held, held)
        };

        let end = settings.first.saturating_add(settings.max_items).min(items.len());
        let window: Vec<MSetItem> = if settings.first < end {
            items.drain(settings.first..end).collect()
        } else {
            Vec::new()
        };

        debug!(
            "collected {} of {total} candidates ({} examined), window {}..{}, matches [{lower}, {estimated}, {upper}]",
            held,
            self.examined,
            settings.first,
            settings.first + window.len()
        );

        Ok(MSetBuilder {
            term_stats: input.term_stats,
            items: window,
            first_rank: settings.first as DocCount,
            matches_lower_bound: lower,
            matches_estimated: estimated,
            matches_upper_bound: upper,
            max_possible: input.max_possible,
            max_attained: self.max_attained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::database::{Database, MemoryDatabase};
    use crate::decider::ValueCountMatchSpy;
    use crate::document::Document;
    use crate::types::DocId;

    fn source(n: usize) -> ShardSet {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::from_documents(
            (0..n).map(|i| Document::builder().value(0, (i % 2) as i64).build()),
        ));
        ShardSet::single(db)
    }

    fn candidates(weights: &[(DocId, f64)]) -> MatchCandidates {
        let mut out = MatchCandidates {
            candidates: weights.iter().map(|(id, w)| Candidate::new(*id, *w)).collect(),
            max_possible: 10.0,
            ..Default::default()
        };
        out.sort_by_relevance();
        out
    }

    fn keyed(doc_id: DocId, weight: f64, key: &[u8]) -> Candidate {
        Candidate {
            collapse_value: key.to_vec(),
            ..Candidate::new(doc_id, weight)
        }
    }

    fn ids(builder: &MSetBuilder) -> Vec<DocId> {
        builder.items.iter().map(|i| i.doc_id).collect()
    }

    #[test]
    fn test_full_collection() {
        let shards = source(3);
        let settings = CollectorSettings {
            max_items: 10,
            check_at_least: 10,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&[(1, 9.0), (2, 6.0), (3, 3.0)]))
            .unwrap();
        assert_eq!(ids(&out), vec![1, 2, 3]);
        assert_eq!(out.matches_lower_bound, 3);
        assert_eq!(out.matches_estimated, 3);
        assert_eq!(out.matches_upper_bound, 3);
        assert_eq!(out.max_attained, 9.0);
    }

    #[test]
    fn test_cutoffs() {
        let shards = source(4);
        let input = candidates(&[(1, 10.0), (2, 8.0), (3, 5.0), (4, 2.0)]);

        let settings = CollectorSettings {
            weight_cutoff: 5.0,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(input.clone())
            .unwrap();
        assert_eq!(ids(&out), vec![1, 2, 3]);

        let settings = CollectorSettings {
            percent_cutoff: 60,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(input)
            .unwrap();
        assert_eq!(ids(&out), vec![1, 2]);
        assert_eq!(out.matches_upper_bound, 2);
    }

    #[test]
    fn test_collapse_keeps_best_and_counts() {
        let shards = source(4);
        let input = MatchCandidates {
            candidates: vec![
                keyed(1, 9.0, b"k"),
                Candidate::new(2, 7.0),
                keyed(3, 5.0, b"k"),
                keyed(4, 4.0, b"k"),
            ],
            ..Default::default()
        };
        let settings = CollectorSettings {
            collapse: true,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards).collect(input).unwrap();
        assert_eq!(ids(&out), vec![1, 2]);
        assert_eq!(out.items[0].collapse_count, 2);
        assert_eq!(out.items[1].collapse_count, 0);
    }

    #[test]
    fn test_collapse_prefers_later_higher_weight() {
        let shards = source(2);
        let input = MatchCandidates {
            candidates: vec![keyed(1, 3.0, b"k"), keyed(2, 8.0, b"k")],
            ..Default::default()
        };
        let settings = CollectorSettings {
            collapse: true,
            sort: SortSettings::by_value(0, true),
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards).collect(input).unwrap();
        assert_eq!(ids(&out), vec![2]);
        assert_eq!(out.items[0].weight, 8.0);
        assert_eq!(out.items[0].collapse_count, 1);
    }

    #[test]
    fn test_window_and_early_stop() {
        let shards = source(10);
        let weights: Vec<(DocId, f64)> = (1..=10).map(|i| (i, 11.0 - i as f64)).collect();
        let settings = CollectorSettings {
            first: 2,
            max_items: 3,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&weights))
            .unwrap();
        assert_eq!(ids(&out), vec![3, 4, 5]);
        assert_eq!(out.first_rank, 2);
        assert_eq!(out.matches_lower_bound, 10);
        assert_eq!(out.matches_estimated, 10);
        assert_eq!(out.matches_upper_bound, 10);
    }

    #[test]
    fn test_early_stop_with_filter_brackets_estimate() {
        let shards = source(10);
        let weights: Vec<(DocId, f64)> = (1..=10).map(|i| (i, 11.0 - i as f64)).collect();
        let settings = CollectorSettings {
            first: 2,
            max_items: 3,
            weight_cutoff: 0.5,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&weights))
            .unwrap();
        assert_eq!(ids(&out), vec![3, 4, 5]);
        assert_eq!(out.matches_lower_bound, 5);
        assert_eq!(out.matches_upper_bound, 10);
        assert!(out.matches_lower_bound <= out.matches_estimated);
        assert!(out.matches_estimated <= out.matches_upper_bound);
    }

    #[test]
    fn test_zero_items_fast_path() {
        let shards = source(3);
        let settings = CollectorSettings {
            max_items: 0,
            check_at_least: 0,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&[(1, 1.0), (2, 1.0), (3, 1.0)]))
            .unwrap();
        assert!(out.items.is_empty());
        assert_eq!(out.matches_lower_bound, 3);
        assert_eq!(out.matches_estimated, 3);
        assert_eq!(out.matches_upper_bound, 3);

        let settings = CollectorSettings {
            max_items: 0,
            check_at_least: 0,
            percent_cutoff: 50,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&[(1, 1.0), (2, 1.0), (3, 1.0)]))
            .unwrap();
        assert_eq!(out.matches_lower_bound, 0);
        assert_eq!(out.matches_estimated, 3);
        assert_eq!(out.matches_upper_bound, 3);
    }

    #[test]
    fn test_spy_sees_rejected_documents() {
        let shards = source(4);
        let mut spy = ValueCountMatchSpy::new(0);
        let odd_only = |doc: &Document| doc.value(0).and_then(|v| v.as_integer()) == Some(1);
        let out = MatchCollector::new(CollectorSettings::default(), &shards)
            .with_decider(Some(&odd_only))
            .with_spy(Some(&mut spy))
            .collect(candidates(&[(1, 4.0), (2, 3.0), (3, 2.0), (4, 1.0)]))
            .unwrap();
        assert_eq!(ids(&out), vec![2, 4]);
        assert_eq!(spy.total(), 4);
        assert_eq!(spy.count("0"), 2);
        assert_eq!(out.max_attained, 3.0);
    }

    #[test]
    fn test_descending_docid_ties() {
        let shards = source(3);
        let settings = CollectorSettings {
            docid_order: DocIdOrder::Descending,
            ..Default::default()
        };
        let out = MatchCollector::new(settings, &shards)
            .collect(candidates(&[(1, 2.0), (2, 2.0), (3, 5.0)]))
            .unwrap();
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }
}
