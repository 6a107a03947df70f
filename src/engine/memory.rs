use std::collections::BTreeMap;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::IndexConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;
use crate::engine::{in_range, merge_max, ScoreMap, SearchEngine, TermMatcher};
use crate::index::inverted::{FieldIndex, InvertedIndex};
use crate::index::posting::PostingList;
use crate::query::ast::{RangeQuery, ALL_FIELDS};
use crate::scoring::scorer::{scorer_for, Scorer};
use crate::search::phrase::phrase_matches;

/// Engine over a per-field inverted index
pub struct InMemoryEngine {
    index: InvertedIndex,
    analyzer: Analyzer,
    scorer: Box<dyn Scorer>,
}

impl InMemoryEngine {
    pub fn build(documents: &[Document], analyzer: Analyzer, config: &IndexConfig) -> Result<Self> {
        let index = InvertedIndex::build(
            documents,
            &analyzer,
            config.index_detail,
            config.store_term_vectors,
        )?;

        debug!(
            docs = documents.len(),
            fields = index.field_names().count(),
            detail = %config.index_detail,
            "Built inverted index"
        );

        Ok(InMemoryEngine {
            index,
            analyzer,
            scorer: scorer_for(config),
        })
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    fn score_postings(&self, field: &FieldIndex, list: &PostingList, factor: f32, scores: &mut ScoreMap) {
        let doc_freq = list.doc_freq();
        for posting in list.iter() {
            let score = self.scorer.score(&field.term_stats(posting, doc_freq)) * factor;
            merge_max(scores, posting.doc_id, score);
        }
    }
}

impl SearchEngine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    fn doc_count(&self) -> usize {
        self.index.doc_count() as usize
    }

    fn field_names(&self) -> Vec<String> {
        self.index.field_names().map(String::from).collect()
    }

    fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    fn term(&self, field: &str, term: &str) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        if let Some(field_index) = self.index.field(field) {
            if let Some(list) = field_index.postings(term) {
                self.score_postings(field_index, list, 1.0, &mut scores);
            }
        }
        Ok(scores)
    }

    fn expanded(&self, field: &str, matcher: &TermMatcher) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        let Some(field_index) = self.index.field(field) else {
            return Ok(scores);
        };

        for (term, factor) in matcher.expand(field_index.terms()) {
            if let Some(list) = field_index.postings(&term) {
                self.score_postings(field_index, list, factor, &mut scores);
            }
        }
        Ok(scores)
    }

    fn phrase(&self, field: &str, terms: &[String], gaps: &[u32], slop: u32) -> Result<ScoreMap> {
        if !self.index.detail().has_positions() {
            return Err(Error::new(
                ErrorKind::UnsupportedQuery,
                format!("phrase query on '{}' needs positions, index detail is {}", field, self.index.detail()),
            ));
        }

        let mut scores = ScoreMap::new();
        let Some(field_index) = self.index.field(field) else {
            return Ok(scores);
        };

        let mut lists = Vec::with_capacity(terms.len());
        for term in terms {
            match field_index.postings(term) {
                Some(list) => lists.push(list),
                None => return Ok(scores),
            }
        }

        let Some(first_list) = lists.first() else {
            return Ok(scores);
        };

        'docs: for first in first_list.iter() {
            let mut postings = Vec::with_capacity(lists.len());
            for list in &lists {
                match list.get(first.doc_id) {
                    Some(posting) => postings.push(posting),
                    None => continue 'docs,
                }
            }

            let positions: Vec<&[u32]> = postings.iter().map(|p| p.positions.as_slice()).collect();
            if !phrase_matches(&positions, gaps, slop) {
                continue;
            }

            let score: f32 = postings
                .iter()
                .zip(&lists)
                .map(|(posting, list)| self.scorer.score(&field_index.term_stats(posting, list.doc_freq())))
                .sum();
            scores.insert(first.doc_id, score);
        }

        Ok(scores)
    }

    fn range(&self, field: &str, query: &RangeQuery) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        if let Some(field_index) = self.index.field(field) {
            for (doc_id, value) in field_index.values() {
                if in_range(value, query) {
                    scores.insert(*doc_id, 1.0);
                }
            }
        }
        Ok(scores)
    }

    fn term_frequencies(&self, field: &str) -> Result<BTreeMap<String, u64>> {
        if !self.index.has_term_vectors() {
            return Err(Error::new(ErrorKind::InvalidState, "term vectors are not stored"));
        }

        let mut frequencies = BTreeMap::new();
        for (_, vector) in self.index.term_vectors() {
            for (name, terms) in vector {
                if field != ALL_FIELDS && name != field {
                    continue;
                }
                for (term, freq) in terms {
                    *frequencies.entry(term.clone()).or_insert(0) += *freq as u64;
                }
            }
        }
        Ok(frequencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancellationToken;
    use crate::core::config::IndexDetail;
    use crate::core::types::DocId;
    use crate::query::ast::Query;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(DocId(0)).with_field("_1", "lucene"),
            Document::new(DocId(1)).with_field("_1", "spark"),
            Document::new(DocId(2)).with_field("_1", "lucene spark"),
        ]
    }

    fn engine(config: &IndexConfig) -> InMemoryEngine {
        InMemoryEngine::build(&docs(), Analyzer::standard(), config).unwrap()
    }

    fn ids(hits: &[crate::search::results::ScoredDoc]) -> Vec<u32> {
        hits.iter().map(|h| h.doc_id.0).collect()
    }

    #[test]
    fn test_term_ranking_prefers_shorter_field() {
        let engine = engine(&IndexConfig::default());
        let hits = engine.search(&Query::term("_1", "Lucene"), 10).unwrap();
        assert_eq!(ids(&hits), vec![0, 2]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_phrase_and_order() {
        let engine = engine(&IndexConfig::default());
        assert_eq!(ids(&engine.search(&Query::phrase("_1", "lucene spark"), 10).unwrap()), vec![2]);
        assert!(engine.search(&Query::phrase("_1", "spark lucene"), 10).unwrap().is_empty());
    }

    #[test]
    fn test_phrase_needs_positions() {
        let config = IndexConfig { index_detail: IndexDetail::DocsAndFreqs, ..IndexConfig::default() };
        let engine = engine(&config);
        let err = engine.search(&Query::phrase("_1", "lucene spark"), 10).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedQuery);

        // a single token phrase is a term query
        assert_eq!(engine.search(&Query::phrase("_1", "spark"), 10).unwrap().len(), 2);
    }

    #[test]
    fn test_prefix_and_fuzzy() {
        let engine = engine(&IndexConfig::default());
        assert_eq!(engine.matching_docs(&Query::prefix("_1", "spa")).unwrap().len(), 2);

        let hits = engine.search(&Query::fuzzy("_1", "lucen", 1), 10).unwrap();
        assert_eq!(ids(&hits), vec![0, 2]);
    }

    #[test]
    fn test_cancelled_evaluation() {
        let engine = engine(&IndexConfig::default());
        let query = Query::term(ALL_FIELDS, "spark");
        let token = CancellationToken::new();
        assert_eq!(engine.search_with(&query, 10, &token).unwrap().len(), 2);

        token.cancel();
        let err = engine.search_with(&query, 10, &token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_all_fields() {
        let engine = engine(&IndexConfig::default());
        assert_eq!(engine.matching_docs(&Query::term(ALL_FIELDS, "spark")).unwrap().len(), 2);
    }

    #[test]
    fn test_term_frequencies_need_vectors() {
        let err = engine(&IndexConfig::default()).term_frequencies("_1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        let config = IndexConfig { store_term_vectors: true, ..IndexConfig::default() };
        let freqs = engine(&config).term_frequencies("_1").unwrap();
        assert_eq!(freqs["lucene"], 2);
        assert_eq!(freqs["spark"], 2);
    }
}
