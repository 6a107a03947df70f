//! Search engines backing a shard.
//!
//! An engine answers leaf queries (term, expanded term, phrase, range) for a
//! single concrete field. Boolean composition, `_all` expansion, analysis of
//! query text and boosts live in [`evaluate`] and are shared by every engine.

pub mod evaluate;
pub mod memory;
pub mod scan;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use regex::Regex;
use roaring::RoaringBitmap;
use crate::analysis::analyzer::Analyzer;
use crate::core::cancel::CancellationToken;
use crate::core::config::{EngineKind, IndexConfig};
use crate::core::error::Result;
use crate::core::types::{DocId, Document, FieldValue};
use crate::query::ast::{Query, RangeQuery};
use crate::search::fuzzy::{edit_penalty, FuzzyAutomaton};
use crate::search::prefix::PrefixIndex;
use crate::search::results::{ScoredDoc, TopKCollector};

pub use memory::InMemoryEngine;
pub use scan::ScanEngine;

/// Per-document scores of one (sub)query
pub type ScoreMap = HashMap<DocId, f32>;

/// How a multi-term query picks the terms it expands to.
pub enum TermMatcher {
    Prefix(String),
    Wildcard(Regex),
    Fuzzy(FuzzyAutomaton),
}

impl TermMatcher {
    /// Score multiplier for `term`, or `None` if it does not match.
    pub fn factor(&self, term: &str) -> Option<f32> {
        match self {
            TermMatcher::Prefix(prefix) => term.starts_with(prefix.as_str()).then_some(1.0),
            TermMatcher::Wildcard(regex) => regex.is_match(term).then_some(1.0),
            TermMatcher::Fuzzy(automaton) => automaton.distance(term).map(edit_penalty),
        }
    }

    /// Matching terms of a field dictionary with their multipliers.
    pub fn expand(&self, terms: &PrefixIndex) -> Vec<(String, f32)> {
        match self {
            TermMatcher::Prefix(prefix) => terms
                .search_prefix(prefix)
                .into_iter()
                .map(|t| (t, 1.0))
                .collect(),
            _ => terms
                .terms_where(|t| self.factor(t).is_some())
                .into_iter()
                .filter_map(|t| self.factor(&t).map(|f| (t, f)))
                .collect(),
        }
    }
}

pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn doc_count(&self) -> usize;

    /// Fields that hold at least one searchable term, sorted.
    fn field_names(&self) -> Vec<String>;

    fn analyzer(&self) -> &Analyzer;

    /// Documents containing an already-normalized `term` in `field`.
    fn term(&self, field: &str, term: &str) -> Result<ScoreMap>;

    /// Documents containing any term accepted by `matcher`; each document
    /// scores as its best matching term.
    fn expanded(&self, field: &str, matcher: &TermMatcher) -> Result<ScoreMap>;

    /// Documents containing `terms` in order. `gaps[i]` is the expected
    /// distance between term i-1 and term i.
    fn phrase(&self, field: &str, terms: &[String], gaps: &[u32], slop: u32) -> Result<ScoreMap>;

    fn range(&self, field: &str, query: &RangeQuery) -> Result<ScoreMap>;

    /// Term -> total frequency over the shard, from stored term vectors.
    fn term_frequencies(&self, field: &str) -> Result<BTreeMap<String, u64>>;

    /// Best `top_k` documents, best first.
    fn search(&self, query: &Query, top_k: usize) -> Result<Vec<ScoredDoc>> {
        self.search_with(query, top_k, &CancellationToken::new())
    }

    /// `search` that gives up with `Cancelled` once `token` is cancelled.
    fn search_with(&self, query: &Query, top_k: usize, token: &CancellationToken) -> Result<Vec<ScoredDoc>> {
        let scores = evaluate::evaluate(self, query, token)?;

        let mut collector = TopKCollector::new(top_k);
        for (doc_id, score) in scores {
            collector.collect(ScoredDoc::new(doc_id, score));
        }

        token.check()?;
        Ok(collector.into_sorted_vec())
    }

    /// Every matching document, unscored.
    fn matching_docs(&self, query: &Query) -> Result<RoaringBitmap> {
        let scores = evaluate::evaluate(self, query, &CancellationToken::new())?;
        Ok(scores.keys().map(|d| d.0).collect())
    }
}

pub fn build_engine(documents: &[Document], config: &IndexConfig) -> Result<Box<dyn SearchEngine>> {
    let analyzer = Analyzer::from_config(config)?;

    Ok(match config.engine {
        EngineKind::InMemory => Box::new(InMemoryEngine::build(documents, analyzer, config)?),
        EngineKind::Scan => Box::new(ScanEngine::build(documents, analyzer, config)),
    })
}

/// Bounds only match values of the same variant.
pub fn in_range(value: &FieldValue, query: &RangeQuery) -> bool {
    let check = |bound: &Option<FieldValue>, accept: fn(Ordering) -> bool| {
        bound.as_ref().is_none_or(|b| value.compare(b).is_some_and(accept))
    };

    check(&query.gt, |o| o == Ordering::Greater)
        && check(&query.gte, |o| o != Ordering::Less)
        && check(&query.lt, |o| o == Ordering::Less)
        && check(&query.lte, |o| o != Ordering::Greater)
}

/// Keep the larger score per document.
pub(crate) fn merge_max(target: &mut ScoreMap, doc_id: DocId, score: f32) {
    target
        .entry(doc_id)
        .and_modify(|s| {
            if score > *s {
                *s = score;
            }
        })
        .or_insert(score);
}
