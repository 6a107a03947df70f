use std::collections::HashMap;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::engine::{merge_max, ScoreMap, SearchEngine, TermMatcher};
use crate::query::ast::{BoolQuery, PhraseQuery, Query, ALL_FIELDS};
use crate::query::kind::MAX_FUZZY_EDITS;
use crate::search::fuzzy::FuzzyAutomaton;
use crate::search::phrase::position_gaps;
use crate::search::prefix::wildcard_regex;

/// Score every document of `engine` that matches `query`. `token` is
/// checked before every clause and every field of an `_all` expansion.
pub fn evaluate<E: SearchEngine + ?Sized>(engine: &E, query: &Query, token: &CancellationToken) -> Result<ScoreMap> {
    token.check()?;
    let analyzer = engine.analyzer();

    let mut scores = match query {
        Query::MatchAll => (0..engine.doc_count() as u32).map(|i| (DocId(i), 1.0)).collect(),

        Query::Term(q) => {
            let term = analyzer.normalize(&q.value);
            per_field(engine, token, &q.field, |field| engine.term(field, &term))?
        }

        Query::Phrase(q) => evaluate_phrase(engine, q, token)?,

        Query::Prefix(q) => {
            let matcher = TermMatcher::Prefix(analyzer.normalize_pattern(&q.prefix));
            per_field(engine, token, &q.field, |field| engine.expanded(field, &matcher))?
        }

        Query::Wildcard(q) => {
            let regex = wildcard_regex(&analyzer.normalize_pattern(&q.pattern))?;
            let matcher = TermMatcher::Wildcard(regex);
            per_field(engine, token, &q.field, |field| engine.expanded(field, &matcher))?
        }

        Query::Fuzzy(q) => {
            let max_edits = q.max_edits.unwrap_or(MAX_FUZZY_EDITS);
            if max_edits > MAX_FUZZY_EDITS {
                return Err(Error::invalid_argument(format!(
                    "max_edits {} exceeds {}", max_edits, MAX_FUZZY_EDITS
                )));
            }
            let term = analyzer.normalize(&q.term);
            let automaton = FuzzyAutomaton::new(&term, max_edits, q.prefix_length.unwrap_or(0));
            let matcher = TermMatcher::Fuzzy(automaton);
            per_field(engine, token, &q.field, |field| engine.expanded(field, &matcher))?
        }

        Query::Range(q) => per_field(engine, token, &q.field, |field| engine.range(field, q))?,

        Query::Bool(q) => evaluate_bool(engine, q, token)?,
    };

    let boost = query.boost();
    if boost != 1.0 {
        for score in scores.values_mut() {
            *score *= boost;
        }
    }

    Ok(scores)
}

/// Runs `leaf` on `field`, or on every field when it is `_all`, keeping
/// each document's best score.
fn per_field<E, F>(engine: &E, token: &CancellationToken, field: &str, mut leaf: F) -> Result<ScoreMap>
where
    E: SearchEngine + ?Sized,
    F: FnMut(&str) -> Result<ScoreMap>,
{
    if field != ALL_FIELDS {
        return leaf(field);
    }

    let mut merged = ScoreMap::new();
    for name in engine.field_names() {
        token.check()?;
        for (doc_id, score) in leaf(&name)? {
            merge_max(&mut merged, doc_id, score);
        }
    }
    Ok(merged)
}

fn evaluate_phrase<E: SearchEngine + ?Sized>(engine: &E, query: &PhraseQuery, token: &CancellationToken) -> Result<ScoreMap> {
    let tokens = engine.analyzer().analyze(&query.phrase.join(" "));

    match tokens.as_slice() {
        [] => Ok(ScoreMap::new()),
        [single] => per_field(engine, token, &query.field, |field| engine.term(field, &single.text)),
        _ => {
            let terms: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
            let positions: Vec<u32> = tokens.iter().map(|t| t.position).collect();
            let gaps = position_gaps(&positions);
            per_field(engine, token, &query.field, |field| engine.phrase(field, &terms, &gaps, query.slop))
        }
    }
}

/// Must and filter clauses intersect, should clauses add their scores, and
/// must-not clauses remove. With no must or filter clause at least one
/// should clause has to match, so a purely negative query matches nothing.
fn evaluate_bool<E: SearchEngine + ?Sized>(engine: &E, query: &BoolQuery, token: &CancellationToken) -> Result<ScoreMap> {
    let mut required: Option<ScoreMap> = None;

    for clause in &query.must {
        let scores = evaluate(engine, clause, token)?;
        required = Some(match required {
            None => scores,
            Some(acc) => intersect(acc, &scores, true),
        });
    }

    for clause in &query.filter {
        let scores = evaluate(engine, clause, token)?;
        required = Some(match required {
            None => scores.into_keys().map(|d| (d, 0.0)).collect(),
            Some(acc) => intersect(acc, &scores, false),
        });
    }

    let mut should_scores = ScoreMap::new();
    let mut should_hits: HashMap<DocId, u32> = HashMap::new();
    for clause in &query.should {
        for (doc_id, score) in evaluate(engine, clause, token)? {
            *should_scores.entry(doc_id).or_insert(0.0) += score;
            *should_hits.entry(doc_id).or_insert(0) += 1;
        }
    }

    let minimum_should_match = query
        .minimum_should_match
        .unwrap_or(if required.is_none() { 1 } else { 0 });

    let mut result = match required {
        Some(mut acc) => {
            for (doc_id, score) in acc.iter_mut() {
                if let Some(extra) = should_scores.get(doc_id) {
                    *score += extra;
                }
            }
            acc
        }
        None => should_scores,
    };

    if minimum_should_match > 0 {
        result.retain(|doc_id, _| should_hits.get(doc_id).copied().unwrap_or(0) >= minimum_should_match);
    }

    for clause in &query.must_not {
        let excluded = evaluate(engine, clause, token)?;
        result.retain(|doc_id, _| !excluded.contains_key(doc_id));
    }

    Ok(result)
}

fn intersect(mut acc: ScoreMap, other: &ScoreMap, add_scores: bool) -> ScoreMap {
    acc.retain(|doc_id, _| other.contains_key(doc_id));
    if add_scores {
        for (doc_id, score) in acc.iter_mut() {
            if let Some(extra) = other.get(doc_id) {
                *score += extra;
            }
        }
    }
    acc
}
