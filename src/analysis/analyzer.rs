use rust_stemmers::Algorithm;
use crate::analysis::filters::{LowercaseFilter, StemmerFilter, StopWordFilter, TokenFilter};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer, WhitespaceTokenizer};
use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::types::FieldValue;

/// Positions skipped between the values of a multi-valued field, so a
/// phrase never matches across two values.
pub const POSITION_GAP: u32 = 100;

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: impl Into<String>, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name: name.into(),
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Tokens for every value of one field. Non-text values become a single
    /// normalized token of their facet form.
    pub fn analyze_values(&self, values: &[FieldValue]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position_base = 0u32;
        let mut offset_base = 0usize;

        for value in values {
            let (mut value_tokens, text_len) = match value {
                FieldValue::Text(text) => (self.analyze(text), text.len()),
                other => {
                    let text = other.as_facet_value();
                    let len = text.len();
                    (vec![Token::new(self.normalize(&text), 0, 0, len)], len)
                }
            };

            let last_position = value_tokens.iter().map(|t| t.position).max();
            for token in &mut value_tokens {
                token.position += position_base;
                token.offset += offset_base;
            }
            if let Some(last) = last_position {
                position_base += last + 1 + POSITION_GAP;
            }
            offset_base += text_len + 1;
            tokens.extend(value_tokens);
        }

        tokens
    }

    /// Run a single query term through the filter chain without tokenizing
    /// it, so term queries line up with indexed terms. A term the chain
    /// drops (a stop word) comes back unchanged.
    pub fn normalize(&self, term: &str) -> String {
        let mut tokens = vec![Token::new(term.to_string(), 0, 0, term.len())];
        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }
        tokens.pop().map(|t| t.text).unwrap_or_else(|| term.to_string())
    }

    /// Lowercase only; used for prefix and wildcard patterns, which must not
    /// be stemmed.
    pub fn normalize_pattern(&self, pattern: &str) -> String {
        if self.is_keyword() {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.tokenizer.name() == "keyword"
    }

    /// Unicode words, lowercased
    pub fn standard() -> Self {
        Analyzer::new("standard", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// Standard pipeline plus English stop words and Snowball stemming
    pub fn english() -> Self {
        Analyzer::new("english", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    pub fn whitespace() -> Self {
        Analyzer::new("whitespace", Box::new(WhitespaceTokenizer))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// Whole value as one verbatim term
    pub fn keyword() -> Self {
        Analyzer::new("keyword", Box::new(KeywordTokenizer))
    }

    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "standard" => Ok(Analyzer::standard()),
            "english" => Ok(Analyzer::english()),
            "whitespace" => Ok(Analyzer::whitespace()),
            "keyword" => Ok(Analyzer::keyword()),
            other => Err(Error::configuration(format!("unrecognized analyzer '{}'", other))),
        }
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        if config.analyzed {
            Analyzer::by_name(&config.analyzer)
        } else {
            Ok(Analyzer::keyword())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_standard_lowercases() {
        let tokens = Analyzer::standard().analyze("Lucene Spark");
        assert_eq!(texts(&tokens), vec!["lucene", "spark"]);
    }

    #[test]
    fn test_english_drops_stop_words_and_stems() {
        let tokens = Analyzer::english().analyze("The running of the bulls");
        assert_eq!(texts(&tokens), vec!["run", "bull"]);
        assert_eq!(tokens[1].position, 4);
    }

    #[test]
    fn test_normalize_matches_indexing() {
        let analyzer = Analyzer::english();
        assert_eq!(analyzer.normalize("Running"), "run");
        assert_eq!(analyzer.normalize("the"), "the");
        assert_eq!(Analyzer::keyword().normalize("New York"), "New York");
    }

    #[test]
    fn test_multi_valued_fields_keep_a_position_gap() {
        let values = vec![FieldValue::from("lucene spark"), FieldValue::from(5i64)];
        let tokens = Analyzer::standard().analyze_values(&values);
        assert_eq!(texts(&tokens), vec!["lucene", "spark", "5"]);
        assert_eq!(tokens[2].position, 2 + POSITION_GAP);
        assert_eq!(tokens[2].offset, 13);
    }

    #[test]
    fn test_unknown_analyzer_is_configuration_error() {
        let mut config = IndexConfig::default();
        config.analyzer = "klingon".to_string();
        assert!(Analyzer::from_config(&config).is_err());

        config.analyzed = false;
        assert!(Analyzer::from_config(&config).unwrap().is_keyword());
    }
}
