//! Command line argument parsing for the enquire CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::enquire::DocIdOrder;
use crate::types::{DocId, ValueSlot};

/// Enquire - rank, collapse and expand full-text search results
#[derive(Parser, Debug, Clone)]
#[command(name = "enquire")]
#[command(about = "Rank, collapse and expand full-text search results")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct EnquireArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl EnquireArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rank documents matching a query
    Search(SearchArgs),

    /// Suggest expansion terms from relevant documents
    Expand(ExpandArgs),
}

/// Where documents come from.
#[derive(Parser, Debug, Clone)]
pub struct CorpusArgs {
    /// JSON lines file, one document per line
    pub documents: PathBuf,

    /// Spread the documents round-robin over this many shards
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub shards: u16,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Query terms (lowercased, matched as whole terms)
    #[arg(required = true)]
    pub terms: Vec<String>,

    /// Require every term instead of any
    #[arg(long)]
    pub all: bool,

    /// Rank of the first result
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Maximum number of results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Minimum number of candidates to assess
    #[arg(long, default_value = "0")]
    pub check_at_least: usize,

    /// JSON file with an EnquireConfig; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Collapse results sharing the value in this slot
    #[arg(long)]
    pub collapse_slot: Option<ValueSlot>,

    /// Sort by the value in this slot
    #[arg(long)]
    pub sort_slot: Option<ValueSlot>,

    /// Sort values in ascending order
    #[arg(long)]
    pub ascending: bool,

    /// Tie-break order by document id
    #[arg(long)]
    pub docid_order: Option<DocIdOrderArg>,

    /// Minimum percentage
    #[arg(long)]
    pub percent_cutoff: Option<u8>,

    /// Minimum weight
    #[arg(long)]
    pub weight_cutoff: Option<f64>,

    /// Count the values of this slot over the examined documents
    #[arg(long)]
    pub facet_slot: Option<ValueSlot>,

    /// Relevant document ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub relevant: Vec<DocId>,

    /// Include document data in the output
    #[arg(long)]
    pub show_data: bool,
}

/// Arguments for term expansion
#[derive(Parser, Debug, Clone)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Relevant document ids, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub relevant: Vec<DocId>,

    /// Query terms to leave out of the suggestions
    #[arg(long, value_delimiter = ',')]
    pub query: Vec<String>,

    /// Maximum number of terms
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Within-document frequency influence
    #[arg(short, long, default_value = "1.0")]
    pub k: f64,

    /// Use exact term frequencies
    #[arg(long)]
    pub exact: bool,

    /// Allow terms that are already in the query
    #[arg(long)]
    pub include_query_terms: bool,

    /// Skip terms starting with this prefix
    #[arg(long)]
    pub exclude_prefix: Option<String>,
}

/// Tie-break order by document id.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocIdOrderArg {
    Ascending,
    Descending,
    DontCare,
}

impl From<DocIdOrderArg> for DocIdOrder {
    fn from(arg: DocIdOrderArg) -> Self {
        match arg {
            DocIdOrderArg::Ascending => DocIdOrder::Ascending,
            DocIdOrderArg::Descending => DocIdOrder::Descending,
            DocIdOrderArg::DontCare => DocIdOrder::DontCare,
        }
    }
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = EnquireArgs::try_parse_from([
            "enquire",
            "search",
            "docs.jsonl",
            "rust",
            "search",
            "--limit",
            "20",
            "--collapse-slot",
            "1",
            "--relevant",
            "3,4",
            "--docid-order",
            "descending",
        ])
        .unwrap();

        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.corpus.documents, PathBuf::from("docs.jsonl"));
            assert_eq!(search_args.corpus.shards, 1);
            assert_eq!(search_args.terms, vec!["rust", "search"]);
            assert_eq!(search_args.limit, 20);
            assert_eq!(search_args.collapse_slot, Some(1));
            assert_eq!(search_args.relevant, vec![3, 4]);
            assert_eq!(search_args.docid_order, Some(DocIdOrderArg::Descending));
            assert!(!search_args.all);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_expand_command() {
        let args = EnquireArgs::try_parse_from([
            "enquire",
            "expand",
            "docs.jsonl",
            "--relevant",
            "1,2",
            "--query",
            "rust",
            "-k",
            "1.5",
            "--exact",
            "--shards",
            "2",
        ])
        .unwrap();

        if let Command::Expand(expand_args) = args.command {
            assert_eq!(expand_args.relevant, vec![1, 2]);
            assert_eq!(expand_args.query, vec!["rust"]);
            assert_eq!(expand_args.k, 1.5);
            assert!(expand_args.exact);
            assert_eq!(expand_args.corpus.shards, 2);
        } else {
            panic!("Expected Expand command");
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(EnquireArgs::try_parse_from(["enquire", "search", "docs.jsonl"]).is_err());
        assert!(EnquireArgs::try_parse_from(["enquire", "expand", "docs.jsonl"]).is_err());
        assert!(
            EnquireArgs::try_parse_from(["enquire", "search", "d.jsonl", "x", "--shards", "0"])
                .is_err()
        );
    }

    #[test]
    fn test_verbosity_levels() {
        let args = EnquireArgs::try_parse_from(["enquire", "-q", "search", "d", "x"]).unwrap();
        assert_eq!(args.verbosity(), 0);

        let args = EnquireArgs::try_parse_from(["enquire", "search", "d", "x"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = EnquireArgs::try_parse_from(["enquire", "-vvv", "search", "d", "x"]).unwrap();
        assert_eq!(args.verbosity(), 3);
    }

    #[test]
    fn test_output_format() {
        let args =
            EnquireArgs::try_parse_from(["enquire", "-f", "json", "search", "d", "x"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
