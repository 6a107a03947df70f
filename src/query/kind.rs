use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::query::ast::{BoolQuery, FuzzyQuery, Query};
use crate::query::parser::QueryParser;

/// Largest edit distance a fuzzy query may ask for.
pub const MAX_FUZZY_EDITS: u8 = 2;

/// The query flavours a shard can execute, all funnelled through
/// `ShardIndex::execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryKind {
    /// Lucene-style query string
    Parsed(String),
    Term { field: String, term: String },
    Prefix { field: String, prefix: String },
    Fuzzy { field: String, term: String, max_edits: u8 },
    Phrase { field: String, phrase: String },
    /// Every field must contain its value as a phrase
    MultiTerm(BTreeMap<String, String>),
}

impl QueryKind {
    pub fn parsed(text: impl Into<String>) -> Self {
        QueryKind::Parsed(text.into())
    }

    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        QueryKind::Term { field: field.into(), term: term.into() }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        QueryKind::Prefix { field: field.into(), prefix: prefix.into() }
    }

    pub fn fuzzy(field: impl Into<String>, term: impl Into<String>, max_edits: u8) -> Self {
        QueryKind::Fuzzy { field: field.into(), term: term.into(), max_edits }
    }

    pub fn phrase(field: impl Into<String>, phrase: impl Into<String>) -> Self {
        QueryKind::Phrase { field: field.into(), phrase: phrase.into() }
    }

    pub fn multi_term<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        QueryKind::MultiTerm(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Parsed(_) => "query",
            QueryKind::Term { .. } => "term",
            QueryKind::Prefix { .. } => "prefix",
            QueryKind::Fuzzy { .. } => "fuzzy",
            QueryKind::Phrase { .. } => "phrase",
            QueryKind::MultiTerm(_) => "multi_term",
        }
    }

    pub fn to_query(&self, parser: &QueryParser) -> Result<Query> {
        match self {
            QueryKind::Parsed(text) => parser.parse(text),
            QueryKind::Term { field, term } => Ok(Query::term(field.as_str(), term.as_str())),
            QueryKind::Prefix { field, prefix } => Ok(Query::prefix(field.as_str(), prefix.as_str())),
            QueryKind::Fuzzy { field, term, max_edits } => {
                if *max_edits > MAX_FUZZY_EDITS {
                    return Err(Error::invalid_argument(format!(
                        "max_edits {} exceeds {}", max_edits, MAX_FUZZY_EDITS
                    )));
                }
                Ok(Query::Fuzzy(FuzzyQuery {
                    field: field.clone(),
                    term: term.clone(),
                    max_edits: Some(*max_edits),
                    prefix_length: Some(parser.fuzzy_prefix_length),
                    boost: None,
                }))
            }
            QueryKind::Phrase { field, phrase } => Ok(Query::phrase(field.as_str(), phrase)),
            QueryKind::MultiTerm(pairs) => {
                if pairs.is_empty() {
                    return Err(Error::invalid_argument("multi-term query needs at least one field"));
                }
                let bool_query = pairs.iter().fold(BoolQuery::new(), |q, (field, value)| {
                    q.with_must(Query::phrase(field.as_str(), value))
                });
                Ok(Query::Bool(bool_query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn test_multi_term_is_conjunction_of_phrases() {
        let kind = QueryKind::multi_term([("_1", "lucene spark"), ("_2", "x")]);
        match kind.to_query(&QueryParser::new()).unwrap() {
            Query::Bool(b) => {
                assert_eq!(b.must.len(), 2);
                assert_eq!(b.must[0], Query::phrase("_1", "lucene spark"));
            }
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn test_fuzzy_edit_limit() {
        let err = QueryKind::fuzzy("_1", "lucene", 3).to_query(&QueryParser::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_parsed_errors_propagate() {
        let err = QueryKind::parsed("(open").to_query(&QueryParser::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuerySyntax);
    }
}
