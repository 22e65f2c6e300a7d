//! Command implementations for the enquire CLI.

use std::fs;
use std::time::Instant;

use anyhow::Context;
use log::debug;

use crate::cli::args::*;
use crate::cli::corpus::load_shards;
use crate::cli::output::*;
use crate::decider::{ExpandDecider, MatchSpy, PrefixExpandDecider, ValueCountMatchSpy};
use crate::enquire::{Enquire, EnquireConfig, ExpandFlags};
use crate::error::Result;
use crate::query::Query;
use crate::rset::RSet;

/// Number of facet values shown.
const FACET_LIMIT: usize = 10;

/// Execute a CLI command.
pub fn execute_command(args: EnquireArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => search(search_args.clone(), &args),
        Command::Expand(expand_args) => expand(expand_args.clone(), &args),
    }
}

fn open_session(corpus: &CorpusArgs) -> Result<Enquire> {
    let shards = load_shards(&corpus.documents, usize::from(corpus.shards))?;
    Ok(Enquire::with_shards(shards))
}

fn lowercase_terms(terms: &[String]) -> Vec<String> {
    terms.iter().map(|term| term.to_lowercase()).collect()
}

/// Rank the documents matching the query terms.
pub fn run_search(args: &SearchArgs) -> Result<SearchResults> {
    let start = Instant::now();
    let mut enquire = open_session(&args.corpus)?;

    if let Some(path) = &args.config {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        enquire.set_config(EnquireConfig::from_json(&json)?)?;
    }

    let terms = lowercase_terms(&args.terms);
    let query = if args.all {
        Query::and(terms)
    } else {
        Query::or(terms)
    };
    enquire.set_query(query, 0);

    if let Some(slot) = args.collapse_slot {
        enquire.set_collapse_key(Some(slot));
    }
    if let Some(slot) = args.sort_slot {
        enquire.set_sort_by_value_then_relevance(slot, args.ascending);
    }
    if let Some(order) = args.docid_order {
        enquire.set_docid_order(order.into());
    }
    if args.percent_cutoff.is_some() || args.weight_cutoff.is_some() {
        let percent = args
            .percent_cutoff
            .unwrap_or(enquire.config().percent_cutoff);
        let weight = args.weight_cutoff.unwrap_or(enquire.config().weight_cutoff);
        enquire.set_cutoff(percent, weight)?;
    }

    let rset: RSet = args.relevant.iter().copied().collect();
    let mut spy = args.facet_slot.map(ValueCountMatchSpy::new);
    let mset = enquire.get_mset(
        args.offset,
        args.limit,
        args.check_at_least,
        Some(&rset),
        None,
        spy.as_mut().map(|s| s as &mut dyn MatchSpy),
    )?;
    debug!("{}", enquire.description());

    if args.show_data {
        mset.fetch_all();
    }

    let mut hits = Vec::with_capacity(mset.len());
    for (index, item) in mset.iter().enumerate() {
        let data = if args.show_data {
            Some(mset.document(index)?.data().to_string())
        } else {
            None
        };
        hits.push(SearchHit {
            rank: mset.first_rank() + index as u64,
            doc_id: item.doc_id,
            weight: item.weight,
            percent: mset.convert_to_percent(item.weight),
            collapse_count: item.collapse_count,
            matching_terms: enquire.get_matching_terms(item.doc_id)?,
            data,
        });
    }

    Ok(SearchResults {
        query: enquire
            .query()
            .map(|q| q.to_string())
            .unwrap_or_default(),
        hits,
        matches_lower_bound: mset.matches_lower_bound(),
        matches_estimated: mset.matches_estimated(),
        matches_upper_bound: mset.matches_upper_bound(),
        max_possible: mset.max_possible(),
        max_attained: mset.max_attained(),
        duration_ms: start.elapsed().as_millis() as u64,
        facets: spy.map(|s| s.top_values(FACET_LIMIT)),
    })
}

/// Suggest terms from the relevant documents.
pub fn run_expand(args: &ExpandArgs) -> Result<ExpandResults> {
    let start = Instant::now();
    let mut enquire = open_session(&args.corpus)?;

    if !args.query.is_empty() {
        enquire.set_query(Query::or(lowercase_terms(&args.query)), 0);
    }

    let rset: RSet = args.relevant.iter().copied().collect();
    let flags = ExpandFlags::default()
        .include_query_terms(args.include_query_terms)
        .use_exact_termfreq(args.exact);
    let decider = args.exclude_prefix.clone().map(PrefixExpandDecider::new);
    let eset = enquire.get_eset(
        args.limit,
        &rset,
        flags,
        args.k,
        decider.as_ref().map(|d| d as &dyn ExpandDecider),
    )?;

    Ok(ExpandResults {
        relevant: rset.iter().collect(),
        terms: eset.items().to_vec(),
        bound: eset.bound(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn search(args: SearchArgs, cli_args: &EnquireArgs) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Searching {}", args.corpus.documents.display());
    }
    let results = run_search(&args)?;
    output_result("Search completed", &results, cli_args)
}

fn expand(args: ExpandArgs, cli_args: &EnquireArgs) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Expanding from {}", args.corpus.documents.display());
    }
    let results = run_expand(&args)?;
    output_result("Expansion completed", &results, cli_args)
}
