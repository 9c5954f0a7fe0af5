//! Extractor boundary: per-page text handed over by the document engines.

mod plain_text;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::RsvpError,
    token::{Token, TokenKind},
};

pub use plain_text::PlainTextExtractor;

/// Fewer `word` tokens than this means a scanned or image-only source.
pub const MIN_READABLE_WORDS: usize = 5;

/// One geometrically ordered line of a page.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLine {
    pub line_index: u32,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub lines: Vec<ExtractedLine>,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl ExtractedPage {
    /// Page with line geometry; `text` is the lines joined by newlines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<ExtractedLine> = lines
            .into_iter()
            .enumerate()
            .map(|(index, text)| ExtractedLine {
                line_index: index as u32,
                text: text.into(),
            })
            .collect();
        let text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            text,
            lines,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Page without line geometry; tokenized as a single line.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lines: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub total_pages: u32,
    pub pages: BTreeMap<u32, ExtractedPage>,
}

impl ExtractedDocument {
    /// Parses an extractor payload and validates it in one step.
    pub fn from_json(payload: &str) -> Result<Self, RsvpError> {
        let document: Self = serde_json::from_str(payload)
            .map_err(|err| RsvpError::Extraction(format!("malformed extractor payload: {err}")))?;
        document.validate()?;
        Ok(document)
    }

    /// Rejects structurally invalid payloads at the extractor seam.
    pub fn validate(&self) -> Result<(), RsvpError> {
        for (&page_num, page) in &self.pages {
            if page_num == 0 || page_num > self.total_pages {
                return Err(RsvpError::Extraction(format!(
                    "page {page_num} outside 1..={}",
                    self.total_pages
                )));
            }

            let ordered = page
                .lines
                .windows(2)
                .all(|pair| pair[0].line_index < pair[1].line_index);
            if !ordered {
                return Err(RsvpError::Extraction(format!(
                    "page {page_num} has unordered line indices"
                )));
            }
        }

        Ok(())
    }
}

/// Black-box text extraction engine for one document.
pub trait Extractor {
    type Error: core::fmt::Display;

    /// Hash of the current source content, used to validate the cache.
    fn content_hash(&mut self) -> Result<String, Self::Error>;

    /// Extract per-page text. May be slow.
    fn extract(&mut self) -> Result<ExtractedDocument, Self::Error>;
}

/// SHA-256 of the source bytes as 64 lowercase hex digits.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Rejects token streams that are too thin to be worth reading.
pub fn validate_token_stream(tokens: &[Token]) -> Result<(), RsvpError> {
    if tokens.is_empty() {
        return Err(RsvpError::Validation(
            "No text found. It may be a scanned or image-only document.".into(),
        ));
    }

    let words = tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Word)
        .count();
    if words < MIN_READABLE_WORDS {
        return Err(RsvpError::Validation(
            "Very little readable text found in this document.".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::generate_token_stream;

    #[test]
    fn payload_with_page_zero_is_rejected() {
        let payload = r#"{"totalPages":1,"pages":{"0":{"text":"hello"}}}"#;
        let err = ExtractedDocument::from_json(payload).unwrap_err();
        assert!(matches!(err, RsvpError::Extraction(_)));
    }

    #[test]
    fn payload_with_lines_parses() {
        let payload = r#"{
            "totalPages": 2,
            "pages": {
                "1": {"text": "a b", "lines": [{"lineIndex": 0, "text": "a b"}], "width": 600, "height": 800},
                "2": {"text": "c"}
            }
        }"#;
        let doc = ExtractedDocument::from_json(payload).unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[&1].lines[0].text, "a b");
        assert!(doc.pages[&2].lines.is_empty());
    }

    #[test]
    fn unordered_lines_are_rejected() {
        let mut page = ExtractedPage::from_lines(["one", "two"]);
        page.lines[1].line_index = 0;
        let doc = ExtractedDocument {
            total_pages: 1,
            pages: BTreeMap::from([(1, page)]),
        };
        assert!(doc.validate().is_err());
    }

    #[test]
    fn content_hash_is_stable_and_sensitive() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash(b"abc").len(), 64);
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }

    #[test]
    fn thin_streams_fail_validation() {
        assert!(matches!(
            validate_token_stream(&[]),
            Err(RsvpError::Validation(_))
        ));

        let pages = BTreeMap::from([(1, ExtractedPage::from_text("one two 3 4 5 6"))]);
        let tokens = generate_token_stream(&pages, "doc");
        assert!(validate_token_stream(&tokens).is_err());

        let pages = BTreeMap::from([(1, ExtractedPage::from_text("one two three four five"))]);
        let tokens = generate_token_stream(&pages, "doc");
        assert!(validate_token_stream(&tokens).is_ok());
    }
}
