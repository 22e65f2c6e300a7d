//! BM25 weighting.

use crate::error::{EnquireError, Result};
use crate::types::TermCount;
use crate::weight::{TermWeightStats, Weight};

/// BM25 weighting scheme.
///
/// The term weight uses the Robertson/Sparck Jones relevance weight, so the
/// relevance set passed to `get_mset` feeds into ranking. Small raw weights
/// are compressed (`w < 2` becomes `w / 2 + 1`) before taking the
/// logarithm, which keeps every term weight non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Weight {
    /// Controls how quickly wdf saturates.
    k1: f64,
    /// Document-length correction applied once per document.
    k2: f64,
    /// Controls how quickly wqf saturates.
    k3: f64,
    /// Strength of document length normalization (0..=1).
    b: f64,
    /// Lower bound on normalized document length.
    min_normlen: f64,
}

impl Default for Bm25Weight {
    fn default() -> Self {
        Bm25Weight {
            k1: 1.0,
            k2: 0.0,
            k3: 1.0,
            b: 0.5,
            min_normlen: 0.5,
        }
    }
}

impl Bm25Weight {
    /// Create a BM25 scheme with the default parameters.
    pub fn new() -> Self {
        Bm25Weight::default()
    }

    /// Create a BM25 scheme with custom parameters.
    pub fn with_params(k1: f64, k2: f64, k3: f64, b: f64, min_normlen: f64) -> Result<Self> {
        for (name, value) in [("k1", k1), ("k2", k2), ("k3", k3), ("min_normlen", min_normlen)] {
            if value.is_nan() || value < 0.0 {
                return Err(EnquireError::invalid_argument(format!(
                    "BM25 parameter {name} must be >= 0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(EnquireError::invalid_argument(format!(
                "BM25 parameter b must be in [0, 1], got {b}"
            )));
        }
        Ok(Bm25Weight {
            k1,
            k2,
            k3,
            b,
            min_normlen,
        })
    }

    /// Get the k1 parameter.
    pub fn k1(&self) -> f64 {
        self.k1
    }

    /// Get the b parameter.
    pub fn b(&self) -> f64 {
        self.b
    }

    fn term_weight(&self, stats: &TermWeightStats) -> f64 {
        let n = stats.collection_size as f64;
        let tf = stats.term_freq as f64;
        let big_r = stats.rset_size as f64;
        let r = stats.rel_term_freq as f64;

        let mut tw = ((r + 0.5) * (n - tf - big_r + r + 0.5)) / ((big_r - r + 0.5) * (tf - r + 0.5));
        tw = tw.max(0.0);
        if tw < 2.0 {
            tw = tw * 0.5 + 1.0;
        }
        let wqf = f64::from(stats.wqf);
        tw.ln() * (self.k3 + 1.0) * wqf / (self.k3 + wqf)
    }

    fn normalized_length(&self, doc_length: TermCount, average_length: f64) -> f64 {
        if average_length <= 0.0 {
            return self.min_normlen;
        }
        (f64::from(doc_length) / average_length).max(self.min_normlen)
    }
}

impl Weight for Bm25Weight {
    fn name(&self) -> &'static str {
        "BM25"
    }

    fn sum_part(&self, stats: &TermWeightStats, wdf: TermCount, doc_length: TermCount) -> f64 {
        if wdf == 0 {
            return 0.0;
        }
        let termweight = self.term_weight(stats);
        if self.k1 == 0.0 {
            return termweight;
        }
        let normlen = self.normalized_length(doc_length, stats.average_length);
        let wdf = f64::from(wdf);
        let denom = self.k1 * (normlen * self.b + (1.0 - self.b)) + wdf;
        termweight * wdf * (self.k1 + 1.0) / denom
    }

    fn max_part(&self, stats: &TermWeightStats) -> f64 {
        self.term_weight(stats) * (self.k1 + 1.0)
    }

    fn sum_extra(&self, doc_length: TermCount, average_length: f64, query_length: TermCount) -> f64 {
        let normlen = self.normalized_length(doc_length, average_length);
        2.0 * self.k2 * f64::from(query_length) / (1.0 + normlen)
    }

    fn max_extra(&self, _average_length: f64, query_length: TermCount) -> f64 {
        2.0 * self.k2 * f64::from(query_length) / (1.0 + self.min_normlen)
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(self.clone())
    }
}
