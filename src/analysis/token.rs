use serde::{Serialize, Deserialize};

/// One analyzed unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,     // ordinal within the field value, used by phrase matching
    pub offset: usize,     // byte offset in the original text
    pub length: usize,     // byte length in the original text
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize, length: usize) -> Self {
        Token {
            text,
            position,
            offset,
            length,
        }
    }

    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }
}
