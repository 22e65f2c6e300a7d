//! Configuration for query sessions.

use serde::{Deserialize, Serialize};

use crate::error::{EnquireError, Result};
use crate::types::ValueSlot;

/// Tie-break order for documents of equal rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocIdOrder {
    /// Lower document ids first.
    #[default]
    Ascending,
    /// Higher document ids first.
    Descending,
    /// Any order will do; currently the same as ascending.
    DontCare,
}

/// What the match set is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Descending weight.
    #[default]
    Relevance,
    /// The value in the sort slot.
    Value,
    /// The value, then descending weight.
    ValueThenRelevance,
    /// Descending weight, then the value.
    RelevanceThenValue,
}

impl SortBy {
    /// Whether this mode reads the sort slot.
    pub fn uses_value(&self) -> bool {
        !matches!(self, SortBy::Relevance)
    }
}

/// Sort mode with its slot and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    /// Ordering criterion.
    pub by: SortBy,
    /// Slot holding the sort value; required by value modes.
    pub value_slot: Option<ValueSlot>,
    /// Whether values sort in ascending order.
    pub ascending: bool,
}

impl SortSettings {
    /// Order by relevance only.
    pub fn relevance() -> Self {
        SortSettings::default()
    }

    /// Order by the value in `slot`.
    pub fn by_value(slot: ValueSlot, ascending: bool) -> Self {
        SortSettings {
            by: SortBy::Value,
            value_slot: Some(slot),
            ascending,
        }
    }

    /// Order by the value in `slot`, then by relevance.
    pub fn by_value_then_relevance(slot: ValueSlot, ascending: bool) -> Self {
        SortSettings {
            by: SortBy::ValueThenRelevance,
            value_slot: Some(slot),
            ascending,
        }
    }

    /// Order by relevance, then by the value in `slot`.
    pub fn by_relevance_then_value(slot: ValueSlot, ascending: bool) -> Self {
        SortSettings {
            by: SortBy::RelevanceThenValue,
            value_slot: Some(slot),
            ascending,
        }
    }

    /// The slot to read sort values from, if the mode needs one.
    pub fn active_slot(&self) -> Option<ValueSlot> {
        if self.by.uses_value() {
            self.value_slot
        } else {
            None
        }
    }

    /// Check that value modes name a slot.
    pub fn validate(&self) -> Result<()> {
        if self.by.uses_value() && self.value_slot.is_none() {
            return Err(EnquireError::invalid_argument(format!(
                "sort mode {:?} needs a value slot",
                self.by
            )));
        }
        Ok(())
    }
}

/// Per-session ranking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnquireConfig {
    /// Slot whose value collapses duplicates; `None` disables collapsing.
    pub collapse_key: Option<ValueSlot>,
    /// Tie-break order by document id.
    pub docid_order: DocIdOrder,
    /// Minimum percentage a match needs (0 disables).
    pub percent_cutoff: u8,
    /// Minimum weight a match needs (0 disables).
    pub weight_cutoff: f64,
    /// Result ordering.
    pub sort: SortSettings,
}

impl Default for EnquireConfig {
    fn default() -> Self {
        EnquireConfig {
            collapse_key: None,
            docid_order: DocIdOrder::Ascending,
            percent_cutoff: 0,
            weight_cutoff: 0.0,
            sort: SortSettings::default(),
        }
    }
}

impl EnquireConfig {
    /// Validate every setting.
    pub fn validate(&self) -> Result<()> {
        validate_percent_cutoff(self.percent_cutoff)?;
        validate_weight_cutoff(self.weight_cutoff)?;
        self.sort.validate()
    }

    /// Load a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EnquireConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn validate_percent_cutoff(percent: u8) -> Result<()> {
    if percent > 100 {
        return Err(EnquireError::invalid_argument(format!(
            "percent cutoff must be in [0, 100], got {percent}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_weight_cutoff(weight: f64) -> Result<()> {
    if weight.is_nan() || weight < 0.0 {
        return Err(EnquireError::invalid_argument(format!(
            "weight cutoff must be >= 0, got {weight}"
        )));
    }
    Ok(())
}

/// Options for expand set generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandFlags {
    /// Allow terms that are already in the query.
    pub include_query_terms: bool,
    /// Use exact collection term frequencies instead of estimates from
    /// the shards holding the relevance set.
    pub use_exact_termfreq: bool,
}

impl ExpandFlags {
    /// Builder form of `include_query_terms`.
    pub fn include_query_terms(mut self, yes: bool) -> Self {
        self.include_query_terms = yes;
        self
    }

    /// Builder form of `use_exact_termfreq`.
    pub fn use_exact_termfreq(mut self, yes: bool) -> Self {
        self.use_exact_termfreq = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EnquireConfig::default();
        assert_eq!(config.collapse_key, None);
        assert_eq!(config.docid_order, DocIdOrder::Ascending);
        assert_eq!(config.percent_cutoff, 0);
        assert_eq!(config.weight_cutoff, 0.0);
        assert_eq!(config.sort.by, SortBy::Relevance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = EnquireConfig {
            percent_cutoff: 101,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_argument());

        let config = EnquireConfig {
            weight_cutoff: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EnquireConfig {
            sort: SortSettings {
                by: SortBy::Value,
                value_slot: None,
                ascending: true,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SortSettings::by_value(3, false).validate().is_ok());
    }

    #[test]
    fn test_config_json() {
        let config = EnquireConfig::from_json(
            r#"{"collapse_key": 2, "docid_order": "descending", "sort": {"by": "value_then_relevance", "value_slot": 1, "ascending": true}}"#,
        )
        .unwrap();
        assert_eq!(config.collapse_key, Some(2));
        assert_eq!(config.docid_order, DocIdOrder::Descending);
        assert_eq!(config.sort.active_slot(), Some(1));
        assert_eq!(config.percent_cutoff, 0);

        let round = EnquireConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round, config);

        assert!(EnquireConfig::from_json(r#"{"percent_cutoff": 200}"#).is_err());
    }

    #[test]
    fn test_expand_flags() {
        let flags = ExpandFlags::default().use_exact_termfreq(true);
        assert!(flags.use_exact_termfreq);
        assert!(!flags.include_query_terms);
    }
}
