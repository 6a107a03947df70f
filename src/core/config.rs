use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::core::error::{Error, Result};
use crate::query::parser::BooleanOperator;

/// How much postings detail the in-memory index keeps per term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndexDetail {
    None,
    Docs,
    DocsAndFreqs,
    DocsAndFreqsAndPositions,
    DocsAndFreqsAndPositionsAndOffsets,
}

impl IndexDetail {
    pub fn is_indexed(&self) -> bool {
        *self != IndexDetail::None
    }

    pub fn has_freqs(&self) -> bool {
        *self >= IndexDetail::DocsAndFreqs
    }

    pub fn has_positions(&self) -> bool {
        *self >= IndexDetail::DocsAndFreqsAndPositions
    }

    pub fn has_offsets(&self) -> bool {
        *self == IndexDetail::DocsAndFreqsAndPositionsAndOffsets
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexDetail::None => "none",
            IndexDetail::Docs => "docs",
            IndexDetail::DocsAndFreqs => "docs_and_freqs",
            IndexDetail::DocsAndFreqsAndPositions => "docs_and_freqs_and_positions",
            IndexDetail::DocsAndFreqsAndPositionsAndOffsets => "docs_and_freqs_and_positions_and_offsets",
        }
    }
}

impl FromStr for IndexDetail {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "none" => Ok(IndexDetail::None),
            "docs" => Ok(IndexDetail::Docs),
            "docs_and_freqs" => Ok(IndexDetail::DocsAndFreqs),
            "docs_and_freqs_and_positions" => Ok(IndexDetail::DocsAndFreqsAndPositions),
            "docs_and_freqs_and_positions_and_offsets" => Ok(IndexDetail::DocsAndFreqsAndPositionsAndOffsets),
            _ => Err(Error::configuration(format!("unrecognized index detail '{}'", s))),
        }
    }
}

impl TryFrom<String> for IndexDetail {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IndexDetail> for String {
    fn from(detail: IndexDetail) -> Self {
        detail.as_str().to_string()
    }
}

impl fmt::Display for IndexDetail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search engine variant backing every shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    InMemory,
    Scan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    Bm25,
    TfIdf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub default_facet_top_n: usize,
    pub max_facet_top_n: usize,

    pub analyzed: bool,                 // false: text indexed verbatim as one token
    pub analyzer: String,               // standard | english | whitespace | keyword
    pub store_term_vectors: bool,
    pub omit_norms: bool,
    pub index_detail: IndexDetail,

    pub default_field: String,          // "_all" searches every indexed field
    pub default_operator: BooleanOperator,
    pub engine: EngineKind,
    pub similarity: Similarity,
    pub parallelism: usize,
    pub fuzzy_prefix_length: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            default_top_k: 10,
            max_top_k: 1000,
            default_facet_top_n: 10,
            max_facet_top_n: 1000,

            analyzed: true,
            analyzer: "standard".to_string(),
            store_term_vectors: false,
            omit_norms: false,
            index_detail: IndexDetail::DocsAndFreqsAndPositionsAndOffsets,

            default_field: "_all".to_string(),
            default_operator: BooleanOperator::Or,
            engine: EngineKind::InMemory,
            similarity: Similarity::Bm25,
            parallelism: num_cpus::get(),
            fuzzy_prefix_length: 0,
        }
    }
}

impl IndexConfig {
    /// Parse a JSON object; missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(Error::configuration(format!(
                "default_top_k {} must be in 1..={}", self.default_top_k, self.max_top_k
            )));
        }
        if self.default_facet_top_n == 0 || self.default_facet_top_n > self.max_facet_top_n {
            return Err(Error::configuration(format!(
                "default_facet_top_n {} must be in 1..={}", self.default_facet_top_n, self.max_facet_top_n
            )));
        }
        if self.parallelism == 0 {
            return Err(Error::configuration("parallelism must be at least 1"));
        }
        if !matches!(self.analyzer.as_str(), "standard" | "english" | "whitespace" | "keyword") {
            return Err(Error::configuration(format!("unrecognized analyzer '{}'", self.analyzer)));
        }
        Ok(())
    }

    pub fn resolve_top_k(&self, top_k: Option<usize>) -> Result<usize> {
        Self::resolve_bound("top_k", top_k, self.default_top_k, self.max_top_k)
    }

    pub fn resolve_top_n(&self, top_n: Option<usize>) -> Result<usize> {
        Self::resolve_bound("top_n", top_n, self.default_facet_top_n, self.max_facet_top_n)
    }

    fn resolve_bound(name: &str, requested: Option<usize>, default: usize, max: usize) -> Result<usize> {
        match requested {
            None => Ok(default),
            Some(0) => Err(Error::invalid_argument(format!("{} must be positive", name))),
            Some(n) if n > max => {
                warn!(requested = n, max, "{} above configured maximum, clamping", name);
                Ok(max)
            }
            Some(n) => Ok(n),
        }
    }
}
