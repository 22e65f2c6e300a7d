//! Expansion over the shards of a [`ShardSet`].
//!
//! Terms are weighted with the Robertson relevance weight
//!
//! ```text
//! w = (r + 0.5)(N - n - R + r + 0.5) / ((R - r + 0.5)(n - r + 0.5))
//! ```
//!
//! compressed to `w / 2 + 1` below 2, then scaled by the average of
//! `(k + 1) wdf / (k L / avgL + wdf)` over the relevant documents, where
//! `L` is the document length. With approximate statistics `n` is
//! estimated from the shards holding relevant documents only.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::database::{Database, ShardSet};
use crate::error::{EnquireError, Result};
use crate::expand::{ExpandCandidate, ExpandEvaluator, ExpandRequest};
use crate::matcher::route_shard_failure;
use crate::types::DocCount;

const OPERATION: &str = "get_eset";

/// Per-term figures gathered from the relevant documents.
#[derive(Debug, Clone, Copy, Default)]
struct RelStats {
    rel_freq: DocCount,
    multiplier: f64,
}

/// What one shard contributes.
#[derive(Debug, Default)]
struct ShardContribution {
    doc_count: DocCount,
    total_length: u64,
    rset_docs: DocCount,
    /// term -> (wdf, doc length) per relevant document of this shard
    occurrences: BTreeMap<String, Vec<(u32, u32)>>,
}

/// Suggests expansion terms from the shards of a [`ShardSet`].
#[derive(Debug, Clone)]
pub struct LocalExpander {
    shards: Arc<ShardSet>,
}

impl LocalExpander {
    /// Create an expander over `shards`.
    pub fn new(shards: Arc<ShardSet>) -> Self {
        LocalExpander { shards }
    }

    fn contribution(
        &self,
        shard: usize,
        db: &dyn Database,
        request: &ExpandRequest<'_>,
    ) -> Result<ShardContribution> {
        let mut out = ShardContribution {
            doc_count: db.doc_count()?,
            total_length: db.total_length()?,
            ..Default::default()
        };
        for global in request.rset.iter() {
            let (owner, local) = self.shards.to_local(global)?;
            if owner != shard {
                continue;
            }
            let terms = match db.term_list(local) {
                Ok(terms) => terms,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let length = db.doc_length(local)?;
            out.rset_docs += 1;
            for (term, wdf) in terms {
                out.occurrences.entry(term).or_default().push((wdf, length));
            }
        }
        Ok(out)
    }

    fn term_freqs(
        &self,
        terms: &[&String],
        shard_filter: &[bool],
        request: &ExpandRequest<'_>,
    ) -> Result<Vec<DocCount>> {
        let per_shard: Vec<(usize, Result<Vec<DocCount>>)> = self
            .shards
            .shards()
            .par_iter()
            .enumerate()
            .filter(|(shard, _)| shard_filter[*shard])
            .map(|(shard, db)| {
                let freqs = terms.iter().map(|term| db.term_freq(term)).collect();
                (shard, freqs)
            })
            .collect();

        let mut totals = vec![0; terms.len()];
        for (shard, result) in per_shard {
            match result {
                Ok(freqs) => {
                    for (total, freq) in totals.iter_mut().zip(freqs) {
                        *total += freq;
                    }
                }
                Err(e) => route_shard_failure(request.error_handler, OPERATION, shard, e)?,
            }
        }
        Ok(totals)
    }
}

impl ExpandEvaluator for LocalExpander {
    fn expand(&self, request: &ExpandRequest<'_>) -> Result<Vec<ExpandCandidate>> {
        if request.rset.is_empty() {
            return Err(EnquireError::invalid_argument(
                "expansion needs at least one relevant document",
            ));
        }

        let shards = self.shards.shards();
        let gathered: Vec<Result<ShardContribution>> = shards
            .par_iter()
            .enumerate()
            .map(|(shard, db)| self.contribution(shard, db.as_ref(), request))
            .collect();

        let mut live = vec![false; shards.len()];
        let mut holds_rset = vec![false; shards.len()];
        let mut doc_count: DocCount = 0;
        let mut total_length: u64 = 0;
        let mut rset_docs: DocCount = 0;
        let mut sampled_docs: DocCount = 0;
        let mut occurrences: BTreeMap<String, Vec<(u32, u32)>> = BTreeMap::new();
        for (shard, result) in gathered.into_iter().enumerate() {
            match result {
                Ok(contribution) => {
                    live[shard] = true;
                    doc_count += contribution.doc_count;
                    total_length += contribution.total_length;
                    if contribution.rset_docs > 0 {
                        holds_rset[shard] = true;
                        rset_docs += contribution.rset_docs;
                        sampled_docs += contribution.doc_count;
                    }
                    for (term, list) in contribution.occurrences {
                        occurrences.entry(term).or_default().extend(list);
                    }
                }
                Err(e) => route_shard_failure(request.error_handler, OPERATION, shard, e)?,
            }
        }

        if rset_docs == 0 {
            debug!("none of the {} relevant documents exist", request.rset.len());
            return Ok(Vec::new());
        }

        let average_length = if doc_count == 0 {
            0.0
        } else {
            total_length as f64 / doc_count as f64
        };
        let k = request.k;

        let rel: Vec<(&String, RelStats)> = occurrences
            .iter()
            .map(|(term, list)| {
                let multiplier: f64 = list
                    .iter()
                    .map(|(wdf, length)| {
                        let wdf = f64::from(*wdf);
                        let normlen = if average_length > 0.0 {
                            f64::from(*length) / average_length
                        } else {
                            1.0
                        };
                        let denom = k * normlen + wdf;
                        if denom > 0.0 { (k + 1.0) * wdf / denom } else { 0.0 }
                    })
                    .sum();
                (
                    term,
                    RelStats {
                        rel_freq: list.len() as DocCount,
                        multiplier,
                    },
                )
            })
            .collect();

        let terms: Vec<&String> = rel.iter().map(|(term, _)| *term).collect();
        let (freqs, scale) = if request.flags.use_exact_termfreq {
            (self.term_freqs(&terms, &live, request)?, 1.0)
        } else {
            let scale = if sampled_docs > 0 {
                doc_count as f64 / sampled_docs as f64
            } else {
                1.0
            };
            (self.term_freqs(&terms, &holds_rset, request)?, scale)
        };

        let n = doc_count as f64;
        let big_r = rset_docs as f64;
        let candidates: Vec<ExpandCandidate> = rel
            .into_iter()
            .zip(freqs)
            .map(|((term, stats), freq)| {
                let r = stats.rel_freq as f64;
                let tf = (freq as f64 * scale).round().max(r);
                let mut tw = ((r + 0.5) * (n - tf - big_r + r + 0.5))
                    / ((big_r - r + 0.5) * (tf - r + 0.5));
                tw = tw.max(0.0);
                if tw < 2.0 {
                    tw = tw * 0.5 + 1.0;
                }
                ExpandCandidate {
                    term: term.clone(),
                    weight: tw.ln() * stats.multiplier / big_r,
                    rel_freq: stats.rel_freq,
                }
            })
            .collect();

        debug!(
            "expanded {} relevant documents into {} candidate terms",
            rset_docs,
            candidates.len()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::document::Document;
    use crate::enquire::config::ExpandFlags;
    use crate::rset::RSet;

    fn expander() -> LocalExpander {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::from_documents(vec![
            Document::builder().text("rust borrow checker lifetimes").build(),
            Document::builder().text("rust borrow traits").build(),
            Document::builder().text("python scripting").build(),
            Document::builder().text("python rust bindings").build(),
            Document::builder().text("go channels").build(),
        ]));
        LocalExpander::new(Arc::new(ShardSet::single(db)))
    }

    fn request(rset: &RSet, flags: ExpandFlags) -> ExpandRequest<'_> {
        ExpandRequest {
            rset,
            k: 1.0,
            flags,
            error_handler: None,
        }
    }

    #[test]
    fn test_terms_of_relevant_documents() {
        let rset: RSet = [1, 2].into_iter().collect();
        let out = expander()
            .expand(&request(&rset, ExpandFlags::default().use_exact_termfreq(true)))
            .unwrap();
        let weight = |t: &str| out.iter().find(|c| c.term == t).map(|c| c.weight);

        assert_eq!(out.len(), 5);
        assert!(weight("python").is_none());
        // in both relevant documents and nowhere else
        assert!(weight("borrow").unwrap() > weight("rust").unwrap());
        assert!(weight("borrow").unwrap() > weight("traits").unwrap());
        assert_eq!(out.iter().find(|c| c.term == "rust").unwrap().rel_freq, 2);
    }

    #[test]
    fn test_empty_rset_is_rejected() {
        let rset = RSet::new();
        let err = expander()
            .expand(&request(&rset, ExpandFlags::default()))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_approximate_matches_exact_on_single_shard() {
        let rset: RSet = [4].into_iter().collect();
        let exact = expander()
            .expand(&request(&rset, ExpandFlags::default().use_exact_termfreq(true)))
            .unwrap();
        let approx = expander()
            .expand(&request(&rset, ExpandFlags::default()))
            .unwrap();
        assert_eq!(exact, approx);
    }

    #[test]
    fn test_missing_relevant_documents() {
        let rset: RSet = [42].into_iter().collect();
        let out = expander()
            .expand(&request(&rset, ExpandFlags::default()))
            .unwrap();
        assert!(out.is_empty());
    }
}
