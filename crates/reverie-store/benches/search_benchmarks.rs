//! Benchmark tests for index search and end-to-end retrieval.
//!
//! # Dataset Size
//!
//! This benchmark uses 1,000 documents for CI speed. To run against a
//! larger corpus, set the environment variable `BENCH_FULL_SCALE=1` before
//! running:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p reverie-store
//! ```
//!
//! Search is an exact O(n) scan, so latency scales linearly with the corpus.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use reverie_store::embedding::{EmbeddingService, MockEmbedding};
use reverie_store::index::VectorIndex;
use reverie_store::persistence::PersistenceManager;
use reverie_store::store::DocumentStore;

/// Number of documents for CI benchmarks.
const CI_DOC_COUNT: usize = 1_000;

/// Number of documents for full-scale benchmarks.
const FULL_SCALE_DOC_COUNT: usize = 100_000;

const DIM: usize = 128;

/// Realistic text chunk (~60 words) for benchmarking.
///
/// Each document is made unique by appending a sequential index, which
/// ensures MockEmbedding produces distinct vectors for each entry.
fn generate_doc_text(index: usize) -> String {
    format!(
        "The retrieval service answers questions using previously ingested \
         documents held in a resident vector index. Each stored document is \
         embedded once, normalized, and appended at the next free position. \
         Queries embed the question text and rank candidates by inner \
         product, skipping tombstoned entries left behind by overwrites and \
         deletions. Document identifier: {}",
        index
    )
}

/// Determine document count based on environment variable.
fn doc_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_DOC_COUNT
    } else {
        CI_DOC_COUNT
    }
}

/// Build a VectorIndex populated with `count` documents using MockEmbedding.
fn build_populated_index(count: usize) -> (VectorIndex, MockEmbedding) {
    let mut index = VectorIndex::new(DIM);
    let embedder = MockEmbedding::with_dimensions(DIM);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    for i in 0..count {
        let text = generate_doc_text(i);
        let embedding = rt.block_on(embedder.embed(&text)).expect("embed failed");
        index.add(&embedding).expect("add failed");
    }

    assert_eq!(index.len(), count, "Index should contain all documents");
    (index, embedder)
}

/// Benchmark raw k-NN search over the index.
fn bench_index_search(c: &mut Criterion) {
    let count = doc_count();
    let (index, embedder) = build_populated_index(count);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    let query_vec = rt
        .block_on(embedder.embed("vector index tombstoned entries ranking"))
        .expect("query embed failed");

    let mut group = c.benchmark_group("index_search");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("knn_top10_{}docs", count), |b| {
        b.iter(|| {
            let hits = index.search(&query_vec, 10).expect("search failed");
            assert!(!hits.is_empty(), "Search should return results");
            hits
        });
    });

    group.finish();
}

/// Benchmark end-to-end retrieval through the DocumentStore, including
/// query embedding and tombstone filtering.
fn bench_store_retrieve(c: &mut Criterion) {
    let count = doc_count();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    let dir = tempfile::tempdir().expect("tempdir failed");
    let store = Arc::new(DocumentStore::open(
        PersistenceManager::new(dir.path()),
        MockEmbedding::with_dimensions(DIM),
        u32::MAX, // no periodic saves during the benchmark
    ));

    rt.block_on(async {
        for i in 0..count {
            store
                .store(&format!("doc-{}", i), &generate_doc_text(i))
                .await
                .expect("store failed");
        }
        // Tombstone a slice of the corpus so retrieval exercises skipping.
        for i in 0..count / 10 {
            store.delete(&format!("doc-{}", i * 10)).await.expect("delete failed");
        }
    });

    let mut group = c.benchmark_group("store_retrieve");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("retrieve_top10_{}docs", count), |b| {
        b.iter(|| {
            let results = rt.block_on(
                store.retrieve("previously ingested documents ranked by inner product", 10),
            );
            assert!(!results.is_empty(), "Retrieval should return results");
            results
        });
    });

    group.finish();
}

criterion_group!(benches, bench_index_search, bench_store_retrieve);
criterion_main!(benches);
