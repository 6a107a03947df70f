use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use shardsearch::core::types::{DocId, Document};
use shardsearch::{converter, Dataset, IndexConfig, StorageLevel};

/// Helper to create test documents
fn create_test_document(id: u32, content_size: usize) -> Document {
    let mut rng = rand::thread_rng();
    let words = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "spark", "lucene"];
    let content: String = (0..content_size)
        .map(|_| words[rng.gen_range(0..words.len())])
        .collect::<Vec<_>>()
        .join(" ");

    Document::new(DocId(id))
        .with_field("title", format!("Document {}", id))
        .with_field("content", content)
        .with_field("category", format!("category_{}", id % 10))
        .with_field("score", rng.gen_range(0.0..100.0f64))
}

fn create_dataset(docs: usize, partitions: usize) -> Dataset<Document> {
    let records = (0..docs as u32).map(|id| create_test_document(id, 50)).collect();
    let ds = Dataset::from_records(records, partitions, converter::<Document>(), IndexConfig::default()).unwrap();
    ds.persist(StorageLevel::MemoryOnly).unwrap();
    ds
}

/// Benchmark shard index construction
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for docs in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(docs), docs, |b, &docs| {
            b.iter(|| black_box(create_dataset(docs, 4)));
        });
    }

    group.finish();
}

/// Benchmark parsed queries against a warm dataset
fn bench_queries(c: &mut Criterion) {
    let ds = create_dataset(10_000, 4);

    let mut group = c.benchmark_group("queries");
    for query in ["content:fox", "content:spark AND content:lucene", "content:qui*", "content:\"lazy dog\"", "content:fxo~1"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), query, |b, query| {
            b.iter(|| black_box(ds.query(query, 10).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark facet aggregation
fn bench_facets(c: &mut Criterion) {
    let ds = create_dataset(10_000, 4);

    c.bench_function("facet_category", |b| {
        b.iter(|| black_box(ds.facet_query("content:fox", "category", 10).unwrap()));
    });
}

/// Benchmark fan-out across partition counts
fn bench_partitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitions");

    for partitions in [1, 2, 4, 8].iter() {
        let ds = create_dataset(10_000, *partitions);
        group.bench_with_input(BenchmarkId::from_parameter(partitions), partitions, |b, _| {
            b.iter(|| black_box(ds.query("content:brown OR content:dog", 10).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_queries, bench_facets, bench_partitions);
criterion_main!(benches);
