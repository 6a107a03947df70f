use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::{debug, info};
use crate::aggregate::facet::FacetTable;
use crate::core::cancel::CancellationToken;
use crate::core::config::IndexConfig;
use crate::core::convert::Converter;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document};
use crate::engine::{build_engine, SearchEngine};
use crate::query::kind::QueryKind;
use crate::query::parser::QueryParser;
use crate::search::results::{RankedResults, ScoredMatch};

/// Everything a shard releases on close
struct ShardState<R> {
    records: Arc<Vec<R>>,
    documents: Vec<Document>,
    engine: Box<dyn SearchEngine>,
}

/// Searchable index over one partition's records.
///
/// Built once from an immutable record list and never mutated afterwards;
/// any number of queries may run concurrently. `close` takes the write lock,
/// so it waits for in-flight queries and every later call fails with a
/// closed-shard error.
pub struct ShardIndex<R> {
    partition: u32,
    config: Arc<IndexConfig>,
    parser: QueryParser,
    converter: Converter<R>,
    state: RwLock<Option<ShardState<R>>>,
}

impl<R> ShardIndex<R>
where
    R: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn build(
        partition: u32,
        records: Arc<Vec<R>>,
        converter: Converter<R>,
        config: Arc<IndexConfig>,
    ) -> Result<Self> {
        let documents: Vec<Document> = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mut doc = converter(record);
                doc.id = DocId(i as u32);
                doc
            })
            .collect();

        let engine = build_engine(&documents, &config)?;

        debug!(
            partition,
            docs = documents.len(),
            engine = engine.name(),
            "Built shard index"
        );

        Ok(ShardIndex {
            partition,
            parser: QueryParser::from_config(&config),
            config,
            converter,
            state: RwLock::new(Some(ShardState { records, documents, engine })),
        })
    }

    fn with_state<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ShardState<R>) -> Result<T>,
    {
        let guard = self.state.read();
        match guard.as_ref() {
            Some(state) => f(state),
            None => Err(Error::closed_shard(self.partition)),
        }
    }

    pub fn partition(&self) -> u32 {
        self.partition
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Run any query flavour and return the best `top_k` records.
    pub fn execute(&self, kind: &QueryKind, top_k: usize) -> Result<RankedResults<R>> {
        self.execute_with(kind, top_k, &CancellationToken::new())
    }

    /// `execute` that stops with `Cancelled` once `token` is cancelled,
    /// leaving the shard untouched.
    pub fn execute_with(&self, kind: &QueryKind, top_k: usize, token: &CancellationToken) -> Result<RankedResults<R>> {
        let query = kind.to_query(&self.parser)?;

        self.with_state(|state| {
            let hits = state.engine.search_with(&query, top_k, token)?;

            debug!(
                partition = self.partition,
                kind = kind.name(),
                hits = hits.len(),
                top_k,
                "Executed shard query"
            );

            let matches = hits
                .into_iter()
                .filter_map(|hit| {
                    state.records.get(hit.doc_id.0 as usize).map(|record| {
                        ScoredMatch::new(hit.score, self.partition, hit.doc_id, record.clone())
                    })
                })
                .collect();

            Ok(RankedResults::from_matches(top_k, matches))
        })
    }

    pub fn query(&self, text: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::parsed(text), top_k)
    }

    pub fn term_query(&self, field: &str, term: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::term(field, term), top_k)
    }

    pub fn prefix_query(&self, field: &str, prefix: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::prefix(field, prefix), top_k)
    }

    pub fn fuzzy_query(&self, field: &str, term: &str, max_edits: u8, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::fuzzy(field, term, max_edits), top_k)
    }

    pub fn phrase_query(&self, field: &str, phrase: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::phrase(field, phrase), top_k)
    }

    /// Records whose every listed field contains its value as a phrase.
    pub fn multi_term_query(&self, pairs: &BTreeMap<String, String>, top_k: usize) -> Result<RankedResults<R>> {
        self.execute(&QueryKind::MultiTerm(pairs.clone()), top_k)
    }

    pub fn facet_query(&self, text: &str, facet_field: &str, top_n: usize) -> Result<FacetTable> {
        self.facet_queries(text, &[facet_field], top_n)
    }

    /// Value counts of each facet field over the records matching `text`.
    /// A document counts once per distinct value.
    pub fn facet_queries<S: AsRef<str>>(&self, text: &str, facet_fields: &[S], top_n: usize) -> Result<FacetTable> {
        let query = self.parser.parse(text)?;

        self.with_state(|state| {
            let matching = state.engine.matching_docs(&query)?;
            let mut table = FacetTable::new(top_n);

            for field in facet_fields {
                let field = field.as_ref();
                let mut counts: BTreeMap<String, u64> = BTreeMap::new();

                for doc_id in matching.iter() {
                    let Some(doc) = state.documents.get(doc_id as usize) else {
                        continue;
                    };
                    let distinct: BTreeSet<String> = doc
                        .get_values(field)
                        .iter()
                        .map(|v| v.as_facet_value())
                        .filter(|v| !v.is_empty())
                        .collect();
                    for value in distinct {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }

                table = table.with_field(field, counts);
            }

            debug!(
                partition = self.partition,
                matched = matching.len(),
                fields = facet_fields.len(),
                "Computed shard facets"
            );
            Ok(table)
        })
    }

    /// Most frequent terms of `field` (or every field for `_all`).
    pub fn term_frequencies(&self, field: &str, top_n: usize) -> Result<FacetTable> {
        self.with_state(|state| {
            let frequencies = state.engine.term_frequencies(field)?;
            Ok(FacetTable::from_counts(field, top_n, frequencies))
        })
    }

    pub fn fields(&self) -> Result<BTreeSet<String>> {
        self.with_state(|state| {
            Ok(state
                .documents
                .iter()
                .flat_map(|doc| doc.field_names().map(String::from))
                .collect())
        })
    }

    pub fn size(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.records.len()))
    }

    pub fn is_defined(&self, record: &R) -> Result<bool> {
        self.with_state(|state| Ok(state.records.contains(record)))
    }

    /// The shard's records, in partition order.
    pub fn records(&self) -> Result<Arc<Vec<R>>> {
        self.with_state(|state| Ok(Arc::clone(&state.records)))
    }

    /// A new shard over the records that satisfy `predicate`.
    pub fn filter<F>(&self, predicate: &F) -> Result<ShardIndex<R>>
    where
        F: Fn(&R) -> bool,
    {
        let kept: Vec<R> = self.with_state(|state| {
            Ok(state.records.iter().filter(|r| predicate(r)).cloned().collect())
        })?;

        ShardIndex::build(
            self.partition,
            Arc::new(kept),
            Arc::clone(&self.converter),
            Arc::clone(&self.config),
        )
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }

    /// Release the index. Idempotent.
    pub fn close(&self) {
        if self.state.write().take().is_some() {
            info!(partition = self.partition, "Closed shard index");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::convert::converter;
    use crate::core::error::ErrorKind;

    fn shard(records: &[&str]) -> ShardIndex<String> {
        let records = Arc::new(records.iter().map(|s| s.to_string()).collect());
        ShardIndex::build(0, records, converter::<String>(), Arc::new(IndexConfig::default())).unwrap()
    }

    #[test]
    fn test_term_query_ranks_exact_match_first() {
        let shard = shard(&["lucene", "spark", "lucene spark"]);
        let results = shard.term_query("_1", "lucene", 10).unwrap();
        let records: Vec<String> = results.into_records();
        assert_eq!(records, vec!["lucene", "lucene spark"]);
    }

    #[test]
    fn test_top_k_bounds_results() {
        let shard = shard(&["a x", "a y", "a z"]);
        assert_eq!(shard.query("a", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_shard() {
        let shard = shard(&[]);
        assert_eq!(shard.size().unwrap(), 0);
        assert!(shard.query("anything", 10).unwrap().is_empty());
        assert!(shard.fields().unwrap().is_empty());
    }

    #[test]
    fn test_facets() {
        let shard = shard(&["a", "c", "c", "a", "b"]);
        let table = shard.facet_query("*:*", "_1", 2).unwrap();
        assert_eq!(table.sorted("_1"), vec![("a".to_string(), 2), ("c".to_string(), 2)]);
    }

    #[test]
    fn test_filter_builds_new_shard() {
        let shard = shard(&["lucene", "spark", "rust"]);
        let filtered = shard.filter(&|r: &String| r != "spark").unwrap();
        assert_eq!(filtered.size().unwrap(), 2);
        assert!(!filtered.is_defined(&"spark".to_string()).unwrap());
        assert_eq!(shard.size().unwrap(), 3);
    }

    #[test]
    fn test_closed_shard_rejects_calls() {
        let shard = shard(&["lucene"]);
        shard.close();
        shard.close();
        assert!(shard.is_closed());
        assert_eq!(shard.size().unwrap_err().kind, ErrorKind::ClosedShard);
        assert_eq!(shard.query("lucene", 1).unwrap_err().kind, ErrorKind::ClosedShard);
    }

    #[test]
    fn test_cancelled_execute() {
        let shard = shard(&["lucene", "spark"]);
        let token = CancellationToken::new();
        token.cancel();

        let err = shard.execute_with(&QueryKind::parsed("lucene OR spark"), 5, &token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert_eq!(shard.query("lucene OR spark", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_syntax_error_surfaces() {
        let shard = shard(&["lucene"]);
        assert_eq!(shard.query("(lucene", 1).unwrap_err().kind, ErrorKind::QuerySyntax);
    }
}
