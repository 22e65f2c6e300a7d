//! Boolean weighting: every match weighs zero.

use crate::types::TermCount;
use crate::weight::{TermWeightStats, Weight};

/// A weighting scheme giving every document weight 0.
///
/// Useful for pure filtering or sort-by-value queries; percentages are all
/// 0 since no document attains a positive weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolWeight;

impl BoolWeight {
    /// Create a new boolean weight.
    pub fn new() -> Self {
        BoolWeight
    }
}

impl Weight for BoolWeight {
    fn name(&self) -> &'static str {
        "Bool"
    }

    fn sum_part(&self, _stats: &TermWeightStats, _wdf: TermCount, _doc_length: TermCount) -> f64 {
        0.0
    }

    fn max_part(&self, _stats: &TermWeightStats) -> f64 {
        0.0
    }

    fn clone_box(&self) -> Box<dyn Weight> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_weight_is_zero() {
        let weight = BoolWeight::new();
        let stats = TermWeightStats::default();
        assert_eq!(weight.sum_part(&stats, 5, 10), 0.0);
        assert_eq!(weight.max_part(&stats), 0.0);
        assert_eq!(weight.sum_extra(5, 1.0, 1), 0.0);
        assert_eq!(weight.clone_box().name(), "Bool");
    }
}
