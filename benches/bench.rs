//! Criterion benchmarks for enquire.
//!
//! Covers the three hot paths of result assembly:
//! - Ranking and collecting a match set (plain, collapsed, value sorted)
//! - Batched document fetching through a match set
//! - Term expansion from a relevance set

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use enquire::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WORDS: &[&str] = &[
    "search", "engine", "full", "text", "index", "query", "document", "field", "term",
    "phrase", "boolean", "relevance", "score", "analysis", "ranking", "filtering", "collapse",
    "expand", "feedback", "shard", "weight", "cutoff", "percent", "bound", "estimate",
];

/// Generate documents with random words and a category in slot 0.
fn generate_documents(count: usize, seed: u64) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let length = rng.random_range(20..120);
            let words: Vec<&str> = (0..length)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect();
            let text = words.join(" ");
            Document::builder()
                .text(&text)
                .data(text.clone())
                .value(0, format!("category{}", i % 50))
                .value(1, rng.random_range(0..1000i64))
                .build()
        })
        .collect()
}

/// Spread documents round-robin over `shard_count` in-memory shards.
fn sharded_session(docs: Vec<Document>, shard_count: usize) -> Enquire {
    let dbs: Vec<MemoryDatabase> = (0..shard_count).map(|_| MemoryDatabase::new()).collect();
    for (i, doc) in docs.into_iter().enumerate() {
        dbs[i % shard_count].add_document(doc);
    }
    let shards: Vec<Arc<dyn Database>> = dbs
        .into_iter()
        .map(|db| Arc::new(db) as Arc<dyn Database>)
        .collect();
    Enquire::with_shards(ShardSet::new(shards).unwrap())
}

/// Benchmark match set assembly.
fn bench_get_mset(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_mset");
    group.throughput(Throughput::Elements(10_000));

    let mut enquire = sharded_session(generate_documents(10_000, 42), 4);
    enquire.set_query(Query::or(["ranking", "feedback", "cutoff"]), 0);

    group.bench_function("relevance_top10", |b| {
        b.iter(|| {
            let mset = enquire.get_mset(0, 10, 0, None, None, None).unwrap();
            black_box(mset)
        })
    });

    group.bench_function("relevance_check_all", |b| {
        b.iter(|| {
            let mset = enquire.get_mset(0, 10, 10_000, None, None, None).unwrap();
            black_box(mset)
        })
    });

    let mut collapsed = sharded_session(generate_documents(10_000, 42), 4);
    collapsed.set_query(Query::or(["ranking", "feedback", "cutoff"]), 0);
    collapsed.set_collapse_key(Some(0));
    group.bench_function("collapsed_top10", |b| {
        b.iter(|| {
            let mset = collapsed.get_mset(0, 10, 0, None, None, None).unwrap();
            black_box(mset)
        })
    });

    let mut sorted = sharded_session(generate_documents(10_000, 42), 4);
    sorted.set_query(Query::or(["ranking", "feedback", "cutoff"]), 0);
    sorted.set_sort_by_value_then_relevance(1, false);
    group.bench_function("value_sorted_top10", |b| {
        b.iter(|| {
            let mset = sorted.get_mset(0, 10, 0, None, None, None).unwrap();
            black_box(mset)
        })
    });

    group.finish();
}

/// Benchmark document fetching through a match set.
fn bench_document_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_fetch");

    let mut enquire = sharded_session(generate_documents(5_000, 7), 2);
    enquire.set_query(Query::or(["document", "index"]), 0);

    group.throughput(Throughput::Elements(100));
    group.bench_function("batched_100", |b| {
        b.iter_with_setup(
            || enquire.get_mset(0, 100, 0, None, None, None).unwrap(),
            |mset| {
                mset.fetch_all();
                for i in 0..mset.len() {
                    black_box(mset.document(i).unwrap());
                }
            },
        )
    });

    group.bench_function("one_by_one_100", |b| {
        b.iter_with_setup(
            || enquire.get_mset(0, 100, 0, None, None, None).unwrap(),
            |mset| {
                for i in 0..mset.len() {
                    black_box(mset.document(i).unwrap());
                }
            },
        )
    });

    group.finish();
}

/// Benchmark term expansion.
fn bench_get_eset(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_eset");
    group.sample_size(20);

    let enquire = sharded_session(generate_documents(5_000, 11), 4);
    let rset: RSet = (1..=20).collect();

    group.bench_function("approximate_termfreq", |b| {
        b.iter(|| {
            let eset = enquire
                .get_eset(10, black_box(&rset), ExpandFlags::default(), 1.0, None)
                .unwrap();
            black_box(eset)
        })
    });

    group.bench_function("exact_termfreq", |b| {
        let flags = ExpandFlags::default().use_exact_termfreq(true);
        b.iter(|| {
            let eset = enquire
                .get_eset(10, black_box(&rset), flags, 1.0, None)
                .unwrap();
            black_box(eset)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get_mset,
    bench_document_fetch,
    bench_get_eset
);
criterion_main!(benches);
