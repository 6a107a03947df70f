use std::collections::BTreeMap;
use serde_json::json;
use shardsearch::core::config::EngineKind;
use shardsearch::{
    converter, CancellationToken, Dataset, DatasetState, ErrorKind, IndexConfig, Partitioner,
    QueryKind, StorageLevel,
};

fn strings(records: &[&str]) -> Vec<String> {
    records.iter().map(|s| s.to_string()).collect()
}

fn dataset(records: &[&str], partitions: usize) -> Dataset<String> {
    Dataset::from_records(strings(records), partitions, converter::<String>(), IndexConfig::default()).unwrap()
}

fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_term_query_ranks_exact_match_first() {
    for partitions in 1..=3 {
        let ds = dataset(&["lucene", "spark", "lucene spark"], partitions);
        let results = ds.term_query("_1", "lucene", 10).unwrap();

        assert_eq!(results.len(), 2, "partitions {}", partitions);
        let records = results.into_records();
        assert_eq!(records, strings(&["lucene", "lucene spark"]), "partitions {}", partitions);
    }
}

#[test]
fn test_count_with_empty_shard() {
    let ds = dataset(&["lucene", "spark", "rust"], 4);
    assert_eq!(ds.partition_sizes().unwrap(), vec![1, 1, 1, 0]);
    assert_eq!(ds.count().unwrap(), 3);
}

#[test]
fn test_exists() {
    let ds = dataset(&["lucene", "spark", "lucene spark"], 2);
    assert!(ds.exists(&fields(&[("_1", "spark")])).unwrap());
    assert!(!ds.exists(&fields(&[("_1", "rust")])).unwrap());
    assert!(ds.exists_record(&"lucene spark".to_string()).unwrap());
    assert!(!ds.exists_record(&"spark lucene".to_string()).unwrap());
}

#[test]
fn test_facet_counts_across_shards() {
    let mut records = vec!["a"; 5];
    records.extend(vec!["c"; 9]);
    records.push("b");

    let ds = dataset(&records, 3);
    let table = ds.facet_query("*:*", "_1", 2).unwrap();
    assert_eq!(table.sorted("_1"), vec![("c".to_string(), 9), ("a".to_string(), 5)]);
}

#[test]
fn test_results_independent_of_partitioning() {
    let records = [
        "rust search engine", "distributed search", "lucene in action", "spark streaming",
        "rust in action", "search with lucene", "sharded rust index", "facets and counts",
    ];

    let baseline = dataset(&records, 1);
    let expected_count = baseline.count().unwrap();
    let expected_fields = baseline.fields().unwrap();
    let expected_facets = baseline.facet_query("*:*", "_1", 100).unwrap();

    for partitions in [2, 3, 5, 8] {
        for partitioner in [Partitioner::RoundRobin, Partitioner::Contiguous] {
            let ds = Dataset::builder(converter::<String>())
                .partitions(partitions)
                .partitioner(partitioner)
                .build(strings(&records))
                .unwrap();

            assert_eq!(ds.count().unwrap(), expected_count);
            assert_eq!(ds.fields().unwrap(), expected_fields);
            assert_eq!(ds.facet_query("*:*", "_1", 100).unwrap(), expected_facets);

            let mut hits = ds.query("rust", 10).unwrap().into_records();
            hits.sort();
            assert_eq!(hits, strings(&["rust in action", "rust search engine", "sharded rust index"]));
        }
    }
}

#[test]
fn test_rebuilt_partition_gives_identical_results() {
    let ds = dataset(&["lucene", "spark", "lucene spark", "rust", "spark rust"], 3);
    let before = ds.query("spark OR rust", 10).unwrap();

    ds.invalidate_partition(0).unwrap();
    ds.invalidate_partition(2).unwrap();
    assert_eq!(ds.state(), DatasetState::Uninitialized);

    let after = ds.query("spark OR rust", 10).unwrap();
    let key = |r: &shardsearch::RankedResults<String>| {
        r.iter().map(|m| (m.score.to_bits(), m.partition, m.doc_id, m.record.clone())).collect::<Vec<_>>()
    };
    assert_eq!(key(&before), key(&after));
}

#[test]
fn test_filter() {
    let ds = dataset(&["lucene", "spark", "lucene spark", "rust"], 2);
    let filtered = ds.filter(|r| r.contains("lucene")).unwrap();

    assert_eq!(filtered.state(), DatasetState::Filtered);
    assert_eq!(filtered.num_partitions(), 2);
    assert_eq!(filtered.count().unwrap(), 2);
    assert!(filtered.term_query("_1", "rust", 10).unwrap().is_empty());
    assert_eq!(ds.count().unwrap(), 4);

    let again = filtered.filter(|r| r.contains("lucene")).unwrap();
    assert_eq!(again.collect().unwrap(), filtered.collect().unwrap());

    let everything = ds.filter(|_| true).unwrap();
    assert_eq!(everything.count().unwrap(), ds.count().unwrap());
}

#[test]
fn test_closed_dataset_rejects_everything() {
    let ds = dataset(&["lucene"], 2);
    let filtered = ds.filter(|_| true).unwrap();
    ds.close();

    assert_eq!(ds.state(), DatasetState::Closed);
    for err in [
        ds.count().unwrap_err(),
        ds.fields().unwrap_err(),
        ds.exists(&fields(&[("_1", "lucene")])).unwrap_err(),
        ds.filter(|_| true).unwrap_err(),
        ds.persist(StorageLevel::MemoryOnly).unwrap_err(),
    ] {
        assert_eq!(err.kind, ErrorKind::ClosedDataset);
    }

    // derived datasets own their shards
    assert_eq!(filtered.count().unwrap(), 1);
}

#[test]
fn test_empty_dataset_is_reported() {
    let ds = dataset(&[], 0);
    assert_eq!(ds.count().unwrap_err().kind, ErrorKind::EmptyDataset);
    assert_eq!(ds.fields().unwrap_err().kind, ErrorKind::EmptyDataset);
}

#[test]
fn test_cancelled_query() {
    let ds = dataset(&["lucene", "spark"], 2);
    let token = CancellationToken::new();
    token.cancel();

    let err = ds.search_with(&QueryKind::parsed("lucene"), Some(5), &token).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);

    // shards are untouched
    assert_eq!(ds.query("lucene", 5).unwrap().len(), 1);
}

#[test]
fn test_query_flavours() {
    let ds = dataset(&["lucene in action", "spark in action", "lucid dreams"], 2);

    assert_eq!(ds.prefix_query("_1", "luc", 10).unwrap().len(), 2);
    assert_eq!(ds.fuzzy_query("_1", "sprak", 1, 10).unwrap().into_records(), strings(&["spark in action"]));
    assert_eq!(ds.phrase_query("_1", "in action", 10).unwrap().len(), 2);
    assert!(ds.phrase_query("_1", "action in", 10).unwrap().is_empty());

    let err = ds.fuzzy_query("_1", "spark", 3, 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = ds.query("_1:(lucene", 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuerySyntax);
}

#[test]
fn test_json_records_and_scan_engine() {
    let records = vec![
        json!({"title": "Lucene in Action", "year": 2010, "tags": ["search", "java"]}),
        json!({"title": "Spark: The Definitive Guide", "year": 2018, "tags": ["big data"]}),
        json!({"title": "Programming Rust", "year": 2021, "tags": ["rust", "systems"]}),
    ];

    let in_memory = Dataset::from_records(records.clone(), 2, converter::<serde_json::Value>(), IndexConfig::default()).unwrap();
    let config = IndexConfig { engine: EngineKind::Scan, ..IndexConfig::default() };
    let scan = Dataset::from_records(records, 2, converter::<serde_json::Value>(), config).unwrap();

    for ds in [&in_memory, &scan] {
        let hits = ds.query("year:[2015 TO *] AND title:rust", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.matches()[0].record["year"], 2021);

        assert_eq!(ds.query("tags:search", 10).unwrap().len(), 1);

        let fields = ds.fields().unwrap();
        assert!(fields.contains("title") && fields.contains("tags") && fields.contains("year"));

        let table = ds.facet_queries("*:*", &["year", "tags"], 10).unwrap();
        assert_eq!(table.count("year", "2018"), 1);
        assert_eq!(table.count("tags", "rust"), 1);
    }
}

#[test]
fn test_term_frequencies() {
    let config = IndexConfig { store_term_vectors: true, ..IndexConfig::default() };
    let ds = Dataset::from_records(
        strings(&["spark spark lucene", "spark rust", "lucene"]),
        2,
        converter::<String>(),
        config,
    ).unwrap();

    let table = ds.term_frequencies("_1", 2).unwrap();
    assert_eq!(table.sorted("_1"), vec![("spark".to_string(), 3), ("lucene".to_string(), 2)]);

    let without = dataset(&["spark"], 1);
    assert_eq!(without.term_frequencies("_1", 2).unwrap_err().kind, ErrorKind::InvalidState);
}

#[test]
fn test_config_from_json() {
    let config = IndexConfig::from_json(r#"{"default_top_k": 3, "analyzer": "english", "index_detail": "docs"}"#).unwrap();
    let ds = Dataset::from_records(strings(&["running", "runs", "walked"]), 2, converter::<String>(), config).unwrap();

    assert_eq!(ds.search(&QueryKind::term("_1", "run"), None).unwrap().len(), 2);

    // no positions indexed
    let err = ds.phrase_query("_1", "running fast", 5).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedQuery);

    assert!(IndexConfig::from_json(r#"{"index_detail": "bogus"}"#).is_err());
}
