use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Unicode word-boundary tokenizer
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for (offset, word) in text.unicode_word_indices() {
            if word.len() <= self.max_token_length {
                tokens.push(Token::new(word.to_string(), position, offset, word.len()));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Splits on whitespace only; punctuation stays attached to terms.
#[derive(Clone, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut start = None;

        for (idx, ch) in text.char_indices() {
            match (ch.is_whitespace(), start) {
                (false, None) => start = Some(idx),
                (true, Some(s)) => {
                    tokens.push(Token::new(text[s..idx].to_string(), tokens.len() as u32, s, idx - s));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            tokens.push(Token::new(text[s..].to_string(), tokens.len() as u32, s, text.len() - s));
        }

        tokens
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Emits the whole input as a single token (unanalyzed fields).
#[derive(Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![Token::new(text.to_string(), 0, 0, text.len())]
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
