//! Token data model shared by the tokenizer, the cache and the engine.

use serde::{Deserialize, Serialize};

/// Classification assigned by the tokenizer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Word,
    Punctuation,
    Number,
    Whitespace,
    Break,
    Other,
}

impl TokenKind {
    /// Whether tokens of this kind advance the word counters.
    pub const fn counts_as_word(self) -> bool {
        matches!(self, Self::Word | Self::Number)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Punctuation => "punctuation",
            Self::Number => "number",
            Self::Whitespace => "whitespace",
            Self::Break => "break",
            Self::Other => "other",
        }
    }
}

/// Back-reference from a token into the extracted document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub page_num: u32,
    pub line_index: u32,
    pub word_index_on_line: u32,
    pub word_index_in_page: u32,
    pub word_index_in_doc: u32,
}

/// Precomputed Optimal Recognition Point of a token.
///
/// `index` counts characters; `start..end` is the byte range of the ORP
/// character inside the token text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrpSplit {
    pub index: usize,
    start: usize,
    end: usize,
}

impl OrpSplit {
    pub(crate) const fn new(index: usize, start: usize, end: usize) -> Self {
        Self { index, start, end }
    }

    pub const fn byte_range(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// One displayable unit of the token stream.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub text: String,
    pub kind: TokenKind,
    pub source: SourceRef,
    pub orp: OrpSplit,
}

impl Token {
    /// Text before the ORP character.
    pub fn left_part(&self) -> &str {
        self.text.get(..self.orp.start).unwrap_or("")
    }

    /// The highlighted ORP character as a string slice.
    pub fn orp_str(&self) -> &str {
        self.text.get(self.orp.start..self.orp.end).unwrap_or("")
    }

    pub fn orp_char(&self) -> Option<char> {
        self.orp_str().chars().next()
    }

    /// Text after the ORP character.
    pub fn right_part(&self) -> &str {
        self.text.get(self.orp.end..).unwrap_or("")
    }

    pub fn page_num(&self) -> u32 {
        self.source.page_num
    }

    /// Checks that a token read back from storage still describes a valid
    /// split of its own text.
    pub fn is_consistent(&self) -> bool {
        let (start, end) = self.orp.byte_range();
        !self.text.is_empty()
            && start < end
            && end <= self.text.len()
            && self.text.is_char_boundary(start)
            && self.text.is_char_boundary(end)
            && self.text[..start].chars().count() == self.orp.index
            && self.kind != TokenKind::Whitespace
    }
}
