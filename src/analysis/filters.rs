use std::collections::HashSet;
use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::token::Token;

/// One stage of an analysis chain. Filters may rewrite or drop tokens but
/// never renumber positions.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;
}

pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in tokens.iter_mut().filter(|t| t.text.chars().any(char::is_uppercase)) {
            token.text = token.text.to_lowercase();
        }
        tokens
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
    "into", "is", "it", "no", "not", "of", "on", "or", "such", "that", "the",
    "their", "then", "there", "these", "they", "this", "to", "was", "will", "with",
];

/// Drops stop words. A phrase spanning a removed word still needs the gap.
pub struct StopWordFilter {
    stop_words: HashSet<String>,
}

impl StopWordFilter {
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopWordFilter {
            stop_words: stop_words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn english() -> Self {
        StopWordFilter::new(ENGLISH_STOP_WORDS.iter().copied())
    }

    pub fn is_stop_word(&self, term: &str) -> bool {
        self.stop_words.contains(term)
    }
}

impl TokenFilter for StopWordFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        tokens.retain(|token| !self.is_stop_word(&token.text));
        tokens
    }

    fn name(&self) -> &str {
        "stop_words"
    }
}

/// Snowball stemming.
pub struct StemmerFilter {
    stemmer: Stemmer,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter { stemmer: Stemmer::create(algorithm) }
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            let stemmed = self.stemmer.stem(&token.text);
            if stemmed != token.text {
                token.text = stemmed.into_owned();
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "stemmer"
    }
}
