use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::Token;
use crate::core::config::{IndexConfig, IndexDetail};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document};
use crate::engine::{in_range, merge_max, ScoreMap, SearchEngine, TermMatcher};
use crate::query::ast::{RangeQuery, ALL_FIELDS};
use crate::scoring::scorer::{scorer_for, Scorer, TermStats};
use crate::search::phrase::phrase_matches;

struct ScannedDoc {
    document: Document,
    tokens: BTreeMap<String, Vec<Token>>,
}

/// Brute-force engine: keeps analyzed documents and matches every query by
/// walking all of them. Slower than the inverted index, with the same
/// results.
pub struct ScanEngine {
    docs: Vec<ScannedDoc>,
    analyzer: Analyzer,
    scorer: Box<dyn Scorer>,
    detail: IndexDetail,
    store_term_vectors: bool,
}

/// Per-field statistics gathered during one scan
struct FieldScan<'a> {
    doc_count: u32,
    total_tokens: u64,
    /// (doc, field length, matched term -> (tf, factor))
    matches: Vec<(DocId, u32, BTreeMap<&'a str, (u32, f32)>)>,
    doc_freq: HashMap<&'a str, u32>,
}

impl ScanEngine {
    pub fn build(documents: &[Document], analyzer: Analyzer, config: &IndexConfig) -> Self {
        let indexed = config.index_detail.is_indexed();
        let docs: Vec<ScannedDoc> = documents
            .iter()
            .map(|doc| ScannedDoc {
                document: doc.clone(),
                tokens: if indexed {
                    doc.fields
                        .iter()
                        .map(|(name, values)| (name.clone(), analyzer.analyze_values(values)))
                        .collect()
                } else {
                    BTreeMap::new()
                },
            })
            .collect();

        debug!(docs = documents.len(), "Prepared scan engine");

        ScanEngine {
            docs,
            analyzer,
            scorer: scorer_for(config),
            detail: config.index_detail,
            store_term_vectors: config.store_term_vectors,
        }
    }

    fn scan<'a, F>(&'a self, field: &str, factor_of: F) -> FieldScan<'a>
    where
        F: Fn(&str) -> Option<f32>,
    {
        let mut scan = FieldScan {
            doc_count: 0,
            total_tokens: 0,
            matches: Vec::new(),
            doc_freq: HashMap::new(),
        };

        for doc in &self.docs {
            let Some(tokens) = doc.tokens.get(field).filter(|t| !t.is_empty()) else {
                continue;
            };
            scan.doc_count += 1;
            scan.total_tokens += tokens.len() as u64;

            let mut matched: BTreeMap<&str, (u32, f32)> = BTreeMap::new();
            for token in tokens {
                if let Some(factor) = factor_of(&token.text) {
                    matched.entry(token.text.as_str()).or_insert((0, factor)).0 += 1;
                }
            }

            if matched.is_empty() {
                continue;
            }
            for term in matched.keys() {
                *scan.doc_freq.entry(*term).or_insert(0) += 1;
            }
            scan.matches.push((doc.document.id, tokens.len() as u32, matched));
        }

        scan
    }

    /// Best matched term per document, as the inverted index scores it.
    fn score_scan(&self, scan: &FieldScan<'_>) -> ScoreMap {
        let avg_field_length = if scan.doc_count == 0 {
            0.0
        } else {
            scan.total_tokens as f32 / scan.doc_count as f32
        };

        let mut scores = ScoreMap::new();
        for (doc_id, field_length, matched) in &scan.matches {
            for (term, (term_freq, factor)) in matched {
                let stats = TermStats {
                    term_freq: if self.detail.has_freqs() { *term_freq } else { 1 },
                    doc_freq: scan.doc_freq.get(term).copied().unwrap_or(1),
                    doc_count: scan.doc_count,
                    field_length: *field_length,
                    avg_field_length,
                };
                merge_max(&mut scores, *doc_id, self.scorer.score(&stats) * factor);
            }
        }
        scores
    }
}

impl SearchEngine for ScanEngine {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn doc_count(&self) -> usize {
        self.docs.len()
    }

    fn field_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.docs.iter().flat_map(|d| d.tokens.keys()).collect();
        names.into_iter().cloned().collect()
    }

    fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    fn term(&self, field: &str, term: &str) -> Result<ScoreMap> {
        let scan = self.scan(field, |t| (t == term).then_some(1.0));
        Ok(self.score_scan(&scan))
    }

    fn expanded(&self, field: &str, matcher: &TermMatcher) -> Result<ScoreMap> {
        let scan = self.scan(field, |t| matcher.factor(t));
        Ok(self.score_scan(&scan))
    }

    fn phrase(&self, field: &str, terms: &[String], gaps: &[u32], slop: u32) -> Result<ScoreMap> {
        if !self.detail.has_positions() {
            return Err(Error::new(
                ErrorKind::UnsupportedQuery,
                format!("phrase query on '{}' needs positions, index detail is {}", field, self.detail),
            ));
        }

        let term_scores: Vec<ScoreMap> = terms
            .iter()
            .map(|term| self.term(field, term))
            .collect::<Result<_>>()?;

        let mut scores = ScoreMap::new();
        for doc in &self.docs {
            let id = doc.document.id;
            if !term_scores.iter().all(|s| s.contains_key(&id)) {
                continue;
            }
            let Some(tokens) = doc.tokens.get(field) else {
                continue;
            };

            let positions: Vec<Vec<u32>> = terms
                .iter()
                .map(|term| tokens.iter().filter(|t| &t.text == term).map(|t| t.position).collect())
                .collect();
            let slices: Vec<&[u32]> = positions.iter().map(|p| p.as_slice()).collect();

            if phrase_matches(&slices, gaps, slop) {
                let score: f32 = term_scores.iter().filter_map(|s| s.get(&id)).sum();
                scores.insert(id, score);
            }
        }

        Ok(scores)
    }

    fn range(&self, field: &str, query: &RangeQuery) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        if !self.detail.is_indexed() {
            return Ok(scores);
        }
        for doc in &self.docs {
            if doc.document.get_values(field).iter().any(|v| in_range(v, query)) {
                scores.insert(doc.document.id, 1.0);
            }
        }
        Ok(scores)
    }

    fn term_frequencies(&self, field: &str) -> Result<BTreeMap<String, u64>> {
        if !self.store_term_vectors {
            return Err(Error::new(ErrorKind::InvalidState, "term vectors are not stored"));
        }

        let mut frequencies = BTreeMap::new();
        for doc in &self.docs {
            for (name, tokens) in &doc.tokens {
                if field != ALL_FIELDS && name != field {
                    continue;
                }
                for token in tokens {
                    *frequencies.entry(token.text.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(frequencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::query::ast::Query;
    use crate::query::parser::QueryParser;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(DocId(0)).with_field("title", "Lucene in action").with_field("year", 2010i64),
            Document::new(DocId(1)).with_field("title", "Spark the definitive guide").with_field("year", 2018i64),
            Document::new(DocId(2)).with_field("title", "Lucene and Spark").with_field("year", 2020i64),
            Document::new(DocId(3)).with_field("title", "Rust in action").with_field("year", 2019i64),
        ]
    }

    fn both(config: &IndexConfig) -> (ScanEngine, InMemoryEngine) {
        (
            ScanEngine::build(&docs(), Analyzer::standard(), config),
            InMemoryEngine::build(&docs(), Analyzer::standard(), config).unwrap(),
        )
    }

    #[test]
    fn test_scan_agrees_with_inverted_index() {
        let (scan, memory) = both(&IndexConfig::default());
        let parser = QueryParser::new();

        for text in [
            "title:lucene",
            "title:spark OR title:rust",
            "title:\"in action\"",
            "title:act*",
            "title:sprak~1",
            "+title:action -title:rust",
            "year:[2015 TO 2019]",
            "lucene",
        ] {
            let query = parser.parse(text).unwrap();
            let a = scan.search(&query, 10).unwrap();
            let b = memory.search(&query, 10).unwrap();
            let a: Vec<(u32, f32)> = a.iter().map(|d| (d.doc_id.0, d.score)).collect();
            let b: Vec<(u32, f32)> = b.iter().map(|d| (d.doc_id.0, d.score)).collect();
            assert_eq!(a, b, "query {}", text);
        }
    }

    #[test]
    fn test_unindexed_matches_nothing() {
        let config = IndexConfig { index_detail: IndexDetail::None, ..IndexConfig::default() };
        let (scan, memory) = both(&config);
        let query = Query::term("title", "lucene");
        assert!(scan.search(&query, 10).unwrap().is_empty());
        assert!(memory.search(&query, 10).unwrap().is_empty());

        // still countable through match-all, which facets rely on
        assert_eq!(scan.matching_docs(&Query::MatchAll).unwrap().len(), 4);
        assert_eq!(memory.matching_docs(&Query::MatchAll).unwrap().len(), 4);
    }

    #[test]
    fn test_pure_negative_matches_nothing() {
        let (scan, _) = both(&IndexConfig::default());
        let query = QueryParser::new().parse("-title:rust").unwrap();
        assert!(scan.matching_docs(&query).unwrap().is_empty());
    }
}
