//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::cli::args::{EnquireArgs, OutputFormat};
use crate::decider::ValueCount;
use crate::eset::ESetItem;
use crate::error::Result;
use crate::types::{DocCount, DocId, TermCount};

/// One ranked document.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: DocCount,
    pub doc_id: DocId,
    pub weight: f64,
    pub percent: u8,
    pub collapse_count: DocCount,
    pub matching_terms: Vec<String>,
    pub data: Option<String>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub matches_lower_bound: DocCount,
    pub matches_estimated: DocCount,
    pub matches_upper_bound: DocCount,
    pub max_possible: f64,
    pub max_attained: f64,
    pub duration_ms: u64,
    pub facets: Option<Vec<ValueCount>>,
}

/// Result structure for term expansion.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpandResults {
    pub relevant: Vec<DocId>,
    pub terms: Vec<ESetItem>,
    pub bound: TermCount,
    pub duration_ms: u64,
}

/// Results that know how to print themselves for people.
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

impl HumanOutput for SearchResults {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Search Results for {}:", self.query);
        let _ = writeln!(out, "═══════════════");

        for hit in &self.hits {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{}. Document {} (Weight: {:.3}, {}%)",
                hit.rank + 1,
                hit.doc_id,
                hit.weight,
                hit.percent
            );
            if !hit.matching_terms.is_empty() {
                let _ = writeln!(out, "   Matching: {}", hit.matching_terms.join(", "));
            }
            if hit.collapse_count > 0 {
                let _ = writeln!(out, "   Collapsed: {} more", hit.collapse_count);
            }
            if let Some(data) = &hit.data {
                let _ = writeln!(out, "   {data}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Matches: about {} (between {} and {})",
            self.matches_estimated, self.matches_lower_bound, self.matches_upper_bound
        );
        let _ = writeln!(out, "Search time: {}ms", self.duration_ms);

        if let Some(facets) = &self.facets {
            let _ = writeln!(out);
            let _ = writeln!(out, "Facets:");
            let _ = writeln!(out, "───────");
            for facet in facets {
                let _ = writeln!(out, "  {} ({})", facet.value, facet.count);
            }
        }
        out
    }
}

impl HumanOutput for ExpandResults {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let relevant: Vec<String> = self.relevant.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(out, "Expansion Terms for [{}]:", relevant.join(", "));
        let _ = writeln!(out, "═══════════════");
        for (i, item) in self.terms.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {} ({:.4})", i + 1, item.term, item.weight);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Candidate terms: {}", self.bound);
        let _ = writeln!(out, "Expansion time: {}ms", self.duration_ms);
        out
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &EnquireArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: HumanOutput>(message: &str, result: &T, args: &EnquireArgs) -> Result<()> {
    if args.verbosity() > 1 {
        println!("{message}");
        println!();
    }
    print!("{}", result.render_human());
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &EnquireArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_results() -> SearchResults {
        SearchResults {
            query: "Query(rust OR borrow)".to_string(),
            hits: vec![
                SearchHit {
                    rank: 0,
                    doc_id: 3,
                    weight: 1.5,
                    percent: 100,
                    collapse_count: 2,
                    matching_terms: vec!["rust".to_string(), "borrow".to_string()],
                    data: Some("rust borrow checker".to_string()),
                },
                SearchHit {
                    rank: 1,
                    doc_id: 1,
                    weight: 0.5,
                    percent: 33,
                    collapse_count: 0,
                    matching_terms: vec!["rust".to_string()],
                    data: None,
                },
            ],
            matches_lower_bound: 2,
            matches_estimated: 2,
            matches_upper_bound: 2,
            max_possible: 2.0,
            max_attained: 1.5,
            duration_ms: 1,
            facets: Some(vec![ValueCount {
                value: "rust".to_string(),
                count: 2,
            }]),
        }
    }

    #[test]
    fn test_search_results_human() {
        let text = search_results().render_human();
        assert!(text.contains("1. Document 3 (Weight: 1.500, 100%)"));
        assert!(text.contains("Matching: rust, borrow"));
        assert!(text.contains("Collapsed: 2 more"));
        assert!(text.contains("2. Document 1 (Weight: 0.500, 33%)"));
        assert!(text.contains("Matches: about 2 (between 2 and 2)"));
        assert!(text.contains("  rust (2)"));
    }

    #[test]
    fn test_search_results_json() {
        let value = serde_json::to_value(search_results()).unwrap();
        assert_eq!(value["hits"][0]["doc_id"], 3);
        assert_eq!(value["hits"][1]["data"], serde_json::Value::Null);
        assert_eq!(value["facets"][0]["value"], "rust");
    }

    #[test]
    fn test_expand_results_human() {
        let results = ExpandResults {
            relevant: vec![1, 2],
            terms: vec![ESetItem {
                weight: 0.75,
                term: "borrow".to_string(),
            }],
            bound: 4,
            duration_ms: 0,
        };
        let text = results.render_human();
        assert!(text.starts_with("Expansion Terms for [1, 2]:"));
        assert!(text.contains("  1. borrow (0.7500)"));
        assert!(text.contains("Candidate terms: 4"));
    }
}
