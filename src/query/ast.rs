use serde::{Serialize, Deserialize};
use crate::core::types::FieldValue;

/// Field name that stands for every indexed field.
pub const ALL_FIELDS: &str = "_all";

/// Executable query tree, shared by every engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),
    Phrase(PhraseQuery),
    Bool(BoolQuery),
    Range(RangeQuery),
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),
    Fuzzy(FuzzyQuery),
    MatchAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub phrase: Vec<String>,
    pub slop: u32,  // Max extra positions allowed between consecutive terms
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Query>,      // All must match (AND)
    pub should: Vec<Query>,    // At least one must match (OR) unless `must` is non-empty
    pub must_not: Vec<Query>,  // None may match (NOT)
    pub filter: Vec<Query>,    // Must match, never scored
    pub minimum_should_match: Option<u32>,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<FieldValue>,
    pub gte: Option<FieldValue>,
    pub lt: Option<FieldValue>,
    pub lte: Option<FieldValue>,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String, // `*` any run of chars, `?` exactly one
    pub boost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyQuery {
    pub field: String,
    pub term: String,
    pub max_edits: Option<u8>,      // Default: 2
    pub prefix_length: Option<u8>,  // Leading chars that must match exactly
    pub boost: Option<f32>,
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Term(TermQuery { field: field.into(), value: value.into(), boost: None })
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Query::Prefix(PrefixQuery { field: field.into(), prefix: prefix.into(), boost: None })
    }

    pub fn fuzzy(field: impl Into<String>, term: impl Into<String>, max_edits: u8) -> Self {
        Query::Fuzzy(FuzzyQuery {
            field: field.into(),
            term: term.into(),
            max_edits: Some(max_edits),
            prefix_length: None,
            boost: None,
        })
    }

    pub fn phrase(field: impl Into<String>, phrase: &str) -> Self {
        Query::Phrase(PhraseQuery {
            field: field.into(),
            phrase: phrase.split_whitespace().map(String::from).collect(),
            slop: 0,
            boost: None,
        })
    }

    pub fn boost(&self) -> f32 {
        let boost = match self {
            Query::Term(q) => q.boost,
            Query::Phrase(q) => q.boost,
            Query::Bool(q) => q.boost,
            Query::Range(q) => q.boost,
            Query::Prefix(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::Fuzzy(q) => q.boost,
            Query::MatchAll => None,
        };
        boost.unwrap_or(1.0)
    }

    /// Returns the query with its boost replaced. `MatchAll` is wrapped in a
    /// single-clause boolean so the boost has somewhere to live.
    pub fn with_boost(self, boost: f32) -> Self {
        match self {
            Query::Term(mut q) => { q.boost = Some(boost); Query::Term(q) }
            Query::Phrase(mut q) => { q.boost = Some(boost); Query::Phrase(q) }
            Query::Bool(mut q) => { q.boost = Some(boost); Query::Bool(q) }
            Query::Range(mut q) => { q.boost = Some(boost); Query::Range(q) }
            Query::Prefix(mut q) => { q.boost = Some(boost); Query::Prefix(q) }
            Query::Wildcard(mut q) => { q.boost = Some(boost); Query::Wildcard(q) }
            Query::Fuzzy(mut q) => { q.boost = Some(boost); Query::Fuzzy(q) }
            Query::MatchAll => {
                let mut q = BoolQuery::new().with_must(Query::MatchAll);
                q.boost = Some(boost);
                Query::Bool(q)
            }
        }
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: Vec::new(),
            minimum_should_match: None,
            boost: None,
        }
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    pub fn with_filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn clause_count(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len() + self.filter.len()
    }
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self::new()
    }
}
