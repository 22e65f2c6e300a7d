//! Evaluator over the shards of a [`ShardSet`].
//!
//! Evaluation runs in two parallel passes over the shards. The first one
//! gathers collection statistics (sizes, lengths, term and relevance
//! frequencies) which are summed into collection-wide figures. The second
//! one walks each shard's posting lists and scores its documents with
//! those figures, so weights do not depend on how the collection is split.
//!
//! A failing shard is handed to the error handler. If it is suppressed the
//! shard is left out of the result.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::database::{Database, ShardSet};
use crate::error::Result;
use crate::matcher::{
    Candidate, MatchCandidates, MatchEvaluator, MatchRequest, route_shard_failure,
};
use crate::mset::TermStats;
use crate::query::QueryOperator;
use crate::types::{DocCount, DocId, TermCount};
use crate::weight::TermWeightStats;

const OPERATION: &str = "get_mset";

/// Statistics contributed by one shard.
#[derive(Debug, Default)]
struct ShardStats {
    doc_count: DocCount,
    total_length: u64,
    /// Per query term, in query order.
    term_freqs: Vec<DocCount>,
    /// Relevance-set documents held by this shard.
    rset_size: DocCount,
    /// Per query term, relevance-set documents it indexes.
    rel_term_freqs: Vec<DocCount>,
}

/// Scores queries against the shards of a [`ShardSet`].
#[derive(Debug, Clone)]
pub struct LocalMatcher {
    shards: Arc<ShardSet>,
}

impl LocalMatcher {
    /// Create an evaluator over `shards`.
    pub fn new(shards: Arc<ShardSet>) -> Self {
        LocalMatcher { shards }
    }

    /// The shards searched.
    pub fn shards(&self) -> &Arc<ShardSet> {
        &self.shards
    }

    fn shard_stats(
        &self,
        shard: usize,
        db: &dyn Database,
        request: &MatchRequest<'_>,
    ) -> Result<ShardStats> {
        let terms = request.query.terms();
        let mut stats = ShardStats {
            doc_count: db.doc_count()?,
            total_length: db.total_length()?,
            term_freqs: Vec::with_capacity(terms.len()),
            rset_size: 0,
            rel_term_freqs: vec![0; terms.len()],
        };
        for term in terms {
            stats.term_freqs.push(db.term_freq(&term.term)?);
        }

        for global in request.rset.iter() {
            let (owner, local) = self.shards.to_local(global)?;
            if owner != shard {
                continue;
            }
            let term_list = match db.term_list(local) {
                Ok(list) => list,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            stats.rset_size += 1;
            for (i, term) in terms.iter().enumerate() {
                if term_list
                    .binary_search_by(|(t, _)| t.as_str().cmp(&term.term))
                    .is_ok()
                {
                    stats.rel_term_freqs[i] += 1;
                }
            }
        }
        Ok(stats)
    }

    fn score_shard(
        &self,
        shard: usize,
        db: &dyn Database,
        request: &MatchRequest<'_>,
        term_stats: &[TermWeightStats],
        average_length: f64,
    ) -> Result<Vec<Candidate>> {
        let terms = request.query.terms();
        // local id -> (weight so far, matched terms, document length)
        let mut scores: BTreeMap<DocId, (f64, usize, TermCount)> = BTreeMap::new();

        for (term, stats) in terms.iter().zip(term_stats) {
            for posting in db.postings(&term.term)? {
                let entry = match scores.entry(posting.doc_id) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert((0.0, 0, db.doc_length(posting.doc_id)?)),
                };
                entry.0 += request.weight.sum_part(stats, posting.wdf, entry.2);
                entry.1 += 1;
            }
        }

        let required = match request.query.operator() {
            QueryOperator::Or => 1,
            QueryOperator::And => terms.len(),
        };

        let mut candidates = Vec::new();
        for (local, (weight, matched, length)) in scores {
            if matched < required {
                continue;
            }
            let extra = request
                .weight
                .sum_extra(length, average_length, request.query_length);
            let mut candidate = Candidate::new(self.shards.to_global(shard, local), weight + extra);
            if let Some(slot) = request.collapse_key {
                candidate.collapse_value = db
                    .value(local, slot)?
                    .map(|v| v.to_key_bytes())
                    .unwrap_or_default();
            }
            if let Some(slot) = request.sort_key {
                candidate.sort_value = db
                    .value(local, slot)?
                    .map(|v| v.to_key_bytes())
                    .unwrap_or_default();
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

impl MatchEvaluator for LocalMatcher {
    fn evaluate(&self, request: &MatchRequest<'_>) -> Result<MatchCandidates> {
        let shards = self.shards.shards();
        let mut skipped = vec![false; shards.len()];

        let gathered: Vec<Result<ShardStats>> = shards
            .par_iter()
            .enumerate()
            .map(|(shard, db)| self.shard_stats(shard, db.as_ref(), request))
            .collect();

        let terms = request.query.terms();
        let mut doc_count: DocCount = 0;
        let mut total_length: u64 = 0;
        let mut rset_size: DocCount = 0;
        let mut term_freqs = vec![0; terms.len()];
        let mut rel_term_freqs = vec![0; terms.len()];
        for (shard, result) in gathered.into_iter().enumerate() {
            match result {
                Ok(stats) => {
                    doc_count += stats.doc_count;
                    total_length += stats.total_length;
                    rset_size += stats.rset_size;
                    for (total, freq) in term_freqs.iter_mut().zip(&stats.term_freqs) {
                        *total += *freq;
                    }
                    for (total, freq) in rel_term_freqs.iter_mut().zip(&stats.rel_term_freqs) {
                        *total += *freq;
                    }
                }
                Err(e) => {
                    route_shard_failure(request.error_handler, OPERATION, shard, e)?;
                    skipped[shard] = true;
                }
            }
        }

        let average_length = if doc_count == 0 {
            0.0
        } else {
            total_length as f64 / doc_count as f64
        };

        let weight_stats: Vec<TermWeightStats> = terms
            .iter()
            .enumerate()
            .map(|(i, term)| TermWeightStats {
                collection_size: doc_count,
                average_length,
                term_freq: term_freqs[i],
                rset_size,
                rel_term_freq: rel_term_freqs[i],
                wqf: term.wqf,
                query_length: request.query_length,
            })
            .collect();

        let mut term_stats = BTreeMap::new();
        let mut max_possible = 0.0;
        for (term, stats) in terms.iter().zip(&weight_stats) {
            let term_weight = request.weight.max_part(stats);
            max_possible += term_weight;
            term_stats.insert(
                term.term.clone(),
                TermStats {
                    term_freq: stats.term_freq,
                    term_weight,
                },
            );
        }
        if !terms.is_empty() {
            max_possible += request
                .weight
                .max_extra(average_length, request.query_length);
        }

        let scored: Vec<(usize, Result<Vec<Candidate>>)> = shards
            .par_iter()
            .enumerate()
            .filter(|(shard, _)| !skipped[*shard])
            .map(|(shard, db)| {
                let result =
                    self.score_shard(shard, db.as_ref(), request, &weight_stats, average_length);
                (shard, result)
            })
            .collect();

        let mut out = MatchCandidates {
            max_possible,
            term_stats,
            ..Default::default()
        };
        for (shard, result) in scored {
            match result {
                Ok(candidates) => out.candidates.extend(candidates),
                Err(e) => {
                    route_shard_failure(request.error_handler, OPERATION, shard, e)?;
                    skipped[shard] = true;
                }
            }
        }
        out.skipped_shards = skipped.iter().filter(|s| **s).count();
        out.sort_by_relevance();

        debug!(
            "evaluated {} over {} shards: {} candidates, max_possible={:.4}, skipped={}",
            request.query,
            shards.len(),
            out.candidates.len(),
            out.max_possible,
            out.skipped_shards
        );
        Ok(out)
    }
}
