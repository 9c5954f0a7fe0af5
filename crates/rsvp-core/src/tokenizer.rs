//! Page text → positioned, classified, ORP-split tokens.
//!
//! Pure functions only: identical `(pages, doc_id)` input always yields an
//! identical token stream, including ids and ORP splits.

use std::collections::BTreeMap;

use crate::{
    extract::ExtractedPage,
    token::{OrpSplit, SourceRef, Token, TokenKind},
};

/// ORP position as a percentage of the core word length.
pub const ORP_RATIO_PERCENT: usize = 35;

const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '—', '–', '-', '"', '\'', '`', '(', ')', '[', ']', '{', '}',
    '…', '“', '”', '‘', '’',
];

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Classify one whitespace-delimited piece of text.
pub fn classify(text: &str) -> TokenKind {
    if text.is_empty() {
        return TokenKind::Other;
    }
    if text.chars().all(char::is_whitespace) {
        return TokenKind::Whitespace;
    }
    if text.chars().all(is_punctuation) {
        return TokenKind::Punctuation;
    }
    if is_number(text) {
        return TokenKind::Number;
    }
    if text.chars().any(|c| c.is_ascii_alphabetic()) {
        return TokenKind::Word;
    }
    TokenKind::Other
}

/// `-?digits([.,]digits)?` followed by optional trailing punctuation.
fn is_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut cursor = 0usize;

    if bytes.first() == Some(&b'-') {
        cursor += 1;
    }

    let int_start = cursor;
    while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
        cursor += 1;
    }
    if cursor == int_start {
        return false;
    }

    if cursor + 1 < bytes.len()
        && matches!(bytes[cursor], b'.' | b',')
        && bytes[cursor + 1].is_ascii_digit()
    {
        cursor += 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
    }

    text[cursor..].chars().all(is_punctuation)
}

/// Character offset of the ORP inside `text`.
///
/// Leading and trailing punctuation are ignored; the ORP sits 35 % into the
/// remaining core. Punctuation-only text anchors on its last character.
pub fn orp_index(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return 0;
    }

    let leading = chars.iter().take_while(|c| is_punctuation(**c)).count();
    let trailing = chars[leading..]
        .iter()
        .rev()
        .take_while(|c| is_punctuation(**c))
        .count();
    let core_len = chars.len() - leading - trailing;

    match core_len {
        0 => leading.min(chars.len() - 1),
        1 => leading,
        _ => leading + core_len * ORP_RATIO_PERCENT / 100,
    }
}

pub fn split_by_orp(text: &str) -> OrpSplit {
    let index = orp_index(text);
    match text.char_indices().nth(index) {
        Some((start, ch)) => OrpSplit::new(index, start, start + ch.len_utf8()),
        None => OrpSplit::new(0, 0, text.len()),
    }
}

/// Split on whitespace runs, keeping the runs as `Whitespace` pieces so that
/// attached punctuation stays glued to its word.
pub fn tokenize_text(text: &str) -> Vec<(&str, TokenKind)> {
    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut in_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(previous) if previous != space => {
                let piece = &text[start..idx];
                pieces.push((piece, classify(piece)));
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }

    if start < text.len() {
        let piece = &text[start..];
        pieces.push((piece, classify(piece)));
    }

    pieces
}

pub fn token_id(doc_id: &str, page_num: u32, global_word_index: u32) -> String {
    format!("{doc_id}-p{page_num}-w{global_word_index}")
}

/// Build the displayable token stream for a document.
///
/// Pages are visited in ascending page number. Pages with line geometry are
/// tokenized line by line; pages without lines fall back to their text blob,
/// treated as line 0. Whitespace pieces never reach the output.
pub fn generate_token_stream(pages: &BTreeMap<u32, ExtractedPage>, doc_id: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut global_word_index = 0u32;

    for (&page_num, page) in pages {
        let mut word_index_in_page = 0u32;

        if !page.lines.is_empty() {
            for line in &page.lines {
                let mut word_index_on_line = 0u32;

                for (text, kind) in tokenize_text(&line.text) {
                    if kind == TokenKind::Whitespace {
                        continue;
                    }

                    tokens.push(build_token(
                        doc_id,
                        text,
                        kind,
                        SourceRef {
                            page_num,
                            line_index: line.line_index,
                            word_index_on_line,
                            word_index_in_page,
                            word_index_in_doc: global_word_index,
                        },
                    ));

                    if kind.counts_as_word() {
                        word_index_on_line += 1;
                        word_index_in_page += 1;
                        global_word_index += 1;
                    }
                }
            }
        } else if !page.text.is_empty() {
            for (text, kind) in tokenize_text(&page.text) {
                if kind == TokenKind::Whitespace {
                    continue;
                }

                tokens.push(build_token(
                    doc_id,
                    text,
                    kind,
                    SourceRef {
                        page_num,
                        line_index: 0,
                        word_index_on_line: word_index_in_page,
                        word_index_in_page,
                        word_index_in_doc: global_word_index,
                    },
                ));

                if kind.counts_as_word() {
                    word_index_in_page += 1;
                    global_word_index += 1;
                }
            }
        }
    }

    tokens
}

fn build_token(doc_id: &str, text: &str, kind: TokenKind, source: SourceRef) -> Token {
    Token {
        id: token_id(doc_id, source.page_num, source.word_index_in_doc),
        text: text.to_owned(),
        kind,
        source,
        orp: split_by_orp(text),
    }
}

/// Up to `count` tokens on either side of `index`, joined by spaces.
pub fn context_snippet(tokens: &[Token], index: usize, count: usize) -> String {
    if tokens.is_empty() {
        return String::new();
    }

    let index = index.min(tokens.len() - 1);
    let start = index.saturating_sub(count);
    let end = (index + count + 1).min(tokens.len());

    tokens[start..end]
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Only real words longer than one character are ORP-aligned.
pub fn should_apply_orp(token: &Token) -> bool {
    token.kind == TokenKind::Word && token.text.chars().count() > 1
}

pub fn count_words(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .filter(|token| token.kind.counts_as_word())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_page(lines: &[&str]) -> ExtractedPage {
        ExtractedPage::from_lines(lines.iter().copied())
    }

    fn two_page_doc() -> BTreeMap<u32, ExtractedPage> {
        BTreeMap::from([
            (1, lines_page(&["The cat sat."])),
            (2, lines_page(&["It slept well."])),
        ])
    }

    #[test]
    fn classification_follows_priority_order() {
        assert_eq!(classify("  \t"), TokenKind::Whitespace);
        assert_eq!(classify("—"), TokenKind::Punctuation);
        assert_eq!(classify("..."), TokenKind::Punctuation);
        assert_eq!(classify("-"), TokenKind::Punctuation);
        assert_eq!(classify("42"), TokenKind::Number);
        assert_eq!(classify("-3.14"), TokenKind::Number);
        assert_eq!(classify("1,5"), TokenKind::Number);
        assert_eq!(classify("12."), TokenKind::Number);
        assert_eq!(classify("2024),"), TokenKind::Number);
        assert_eq!(classify("1,000,000"), TokenKind::Other);
        assert_eq!(classify("word,"), TokenKind::Word);
        assert_eq!(classify("(hello)"), TokenKind::Word);
        assert_eq!(classify("3rd"), TokenKind::Word);
        assert_eq!(classify("日本"), TokenKind::Other);
    }

    #[test]
    fn orp_split_skips_trailing_punctuation() {
        let split = split_by_orp("running,");
        assert_eq!(split.index, 2);

        let tokens = generate_token_stream(&BTreeMap::from([(1, lines_page(&["running,"]))]), "d");
        let token = &tokens[0];
        assert_eq!(token.left_part(), "ru");
        assert_eq!(token.orp_char(), Some('n'));
        assert_eq!(token.right_part(), "ning,");
    }

    #[test]
    fn orp_split_skips_leading_punctuation() {
        // core "hello" → floor(5 * 0.35) = 1, plus one leading quote
        assert_eq!(orp_index("\"hello\""), 2);
        assert_eq!(orp_index("a"), 0);
        assert_eq!(orp_index("(a)"), 1);
    }

    #[test]
    fn punctuation_only_tokens_get_degenerate_split() {
        let tokens = generate_token_stream(&BTreeMap::from([(1, lines_page(&["wait — go"]))]), "d");
        let dash = &tokens[1];
        assert_eq!(dash.kind, TokenKind::Punctuation);
        assert_eq!(dash.left_part(), "");
        assert_eq!(dash.orp_str(), "—");
        assert_eq!(dash.right_part(), "");
        assert!(dash.is_consistent());
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let split = split_by_orp("über");
        assert_eq!(split.index, 1);
        let tokens = generate_token_stream(&BTreeMap::from([(1, lines_page(&["über"]))]), "d");
        assert_eq!(tokens[0].left_part(), "ü");
        assert_eq!(tokens[0].orp_str(), "b");
        assert_eq!(tokens[0].right_part(), "er");
    }

    #[test]
    fn whitespace_pieces_keep_punctuation_attached() {
        let pieces = tokenize_text("word,  next");
        assert_eq!(
            pieces,
            vec![
                ("word,", TokenKind::Word),
                ("  ", TokenKind::Whitespace),
                ("next", TokenKind::Word),
            ]
        );
    }

    #[test]
    fn whitespace_never_reaches_the_stream() {
        let pages = BTreeMap::from([(1, lines_page(&["  lots   of\tspace  ", "", "   "]))]);
        let tokens = generate_token_stream(&pages, "d");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["lots", "of", "space"]);
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Whitespace));
    }

    #[test]
    fn standalone_punctuation_shares_the_next_word_id() {
        let pages = BTreeMap::from([(1, lines_page(&["wait \u{2014} go"]))]);
        let tokens = generate_token_stream(&pages, "d");
        let ids: Vec<&str> = tokens.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["d-p1-w0", "d-p1-w1", "d-p1-w1"]);
    }

    #[test]
    fn tokenization_is_deterministic() {
        let pages = two_page_doc();
        assert_eq!(generate_token_stream(&pages, "doc"), generate_token_stream(&pages, "doc"));
    }

    #[test]
    fn word_indices_are_contiguous_and_reset_per_page_and_line() {
        let pages = BTreeMap::from([
            (1, lines_page(&["One two, - three", "four 5 six"])),
            (3, ExtractedPage::from_text("seven eight")),
        ]);
        let tokens = generate_token_stream(&pages, "doc");

        let doc_indices: Vec<u32> = tokens
            .iter()
            .filter(|t| t.kind.counts_as_word())
            .map(|t| t.source.word_index_in_doc)
            .collect();
        assert_eq!(doc_indices, (0..8).collect::<Vec<u32>>());

        let four = tokens.iter().find(|t| t.text == "four").unwrap();
        assert_eq!(four.source.line_index, 1);
        assert_eq!(four.source.word_index_on_line, 0);
        assert_eq!(four.source.word_index_in_page, 3);

        let seven = tokens.iter().find(|t| t.text == "seven").unwrap();
        assert_eq!(seven.source.page_num, 3);
        assert_eq!(seven.source.word_index_in_page, 0);
        assert_eq!(seven.id, "doc-p3-w6");
    }

    #[test]
    fn two_page_document_yields_six_tokens() {
        let tokens = generate_token_stream(&two_page_doc(), "doc");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["The", "cat", "sat.", "It", "slept", "well."]);

        for (index, token) in tokens.iter().enumerate() {
            assert_eq!(token.source.word_index_in_doc as usize, index);
        }
        assert_eq!(tokens[3].id, "doc-p2-w3");
        assert_eq!(tokens[3].source.word_index_in_page, 0);
    }

    #[test]
    fn snippet_is_clamped_to_stream_bounds() {
        let tokens = generate_token_stream(&two_page_doc(), "doc");
        assert_eq!(context_snippet(&tokens, 0, 3), "The cat sat. It");
        assert_eq!(context_snippet(&tokens, 5, 1), "slept well.");
        assert_eq!(context_snippet(&tokens, 99, 0), "well.");
        assert_eq!(context_snippet(&[], 0, 3), "");
    }

    #[test]
    fn orp_applies_to_multi_char_words_only() {
        let pages = BTreeMap::from([(1, lines_page(&["a word 42 ;"]))]);
        let tokens = generate_token_stream(&pages, "d");
        let applied: Vec<bool> = tokens.iter().map(should_apply_orp).collect();
        assert_eq!(applied, [false, true, false, false]);
        assert_eq!(count_words(&tokens), 3);
    }
}
