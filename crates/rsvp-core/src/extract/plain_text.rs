use std::collections::BTreeMap;

use super::{ExtractedDocument, ExtractedPage, Extractor, content_hash};

const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum PlainTextError {
    #[error("document contains no text")]
    Empty,
}

/// Extractor for plain text: form feeds separate pages, newlines separate
/// lines.
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    bytes: Vec<u8>,
}

impl PlainTextExtractor {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl Extractor for PlainTextExtractor {
    type Error = PlainTextError;

    fn content_hash(&mut self) -> Result<String, Self::Error> {
        Ok(content_hash(&self.bytes))
    }

    fn extract(&mut self) -> Result<ExtractedDocument, Self::Error> {
        let text = String::from_utf8_lossy(&self.bytes);
        if text.trim().is_empty() {
            return Err(PlainTextError::Empty);
        }

        let mut pages = BTreeMap::new();
        for (index, page_text) in text.split(PAGE_BREAK).enumerate() {
            let page = ExtractedPage::from_lines(
                page_text
                    .split('\n')
                    .map(|line| line.strip_suffix('\r').unwrap_or(line)),
            );
            pages.insert(index as u32 + 1, page);
        }

        Ok(ExtractedDocument {
            total_pages: pages.len() as u32,
            pages,
        })
    }
}
