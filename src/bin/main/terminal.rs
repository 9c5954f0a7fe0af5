use std::io::{self, Stdout, Write};

use rsvp_core::{
    PlaybackView, Token, text_policy::position_label, tokenizer::should_apply_orp,
};

/// Column the ORP character is pinned to.
const ORP_COLUMN: usize = 24;
const WORD_FIELD: usize = 48;
const HIGHLIGHT: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Single-line RSVP renderer for an ANSI terminal.
pub(super) struct TerminalRenderer {
    out: Stdout,
    finished_shown: bool,
}

impl TerminalRenderer {
    pub(super) fn new() -> Self {
        Self {
            out: io::stdout(),
            finished_shown: false,
        }
    }

    pub(super) fn status(&mut self, message: &str) -> io::Result<()> {
        write!(self.out, "{CLEAR_LINE}{message}")?;
        self.out.flush()
    }

    pub(super) fn render(&mut self, view: &PlaybackView<'_>) -> io::Result<()> {
        let word = view.current_token.map(token_line).unwrap_or_default();
        write!(self.out, "{CLEAR_LINE}{word}  {}", status_line(view))?;
        if view.finished && !self.finished_shown {
            write!(self.out, "  end of document")?;
        }
        self.finished_shown = view.finished;
        self.out.flush()
    }

    pub(super) fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Token padded so its ORP character lands on [`ORP_COLUMN`], then padded
/// on the right to a fixed width.
fn token_line(token: &Token) -> String {
    let (pad, body, visible) = if should_apply_orp(token) {
        let left = token.left_part();
        let right = token.right_part();
        let visible = left.chars().count() + token.orp_str().chars().count() + right.chars().count();
        (
            ORP_COLUMN.saturating_sub(left.chars().count()),
            format!("{left}{HIGHLIGHT}{}{RESET}{right}", token.orp_str()),
            visible,
        )
    } else {
        (ORP_COLUMN, token.text.clone(), token.text.chars().count())
    };

    let tail = WORD_FIELD.saturating_sub(pad + visible);
    format!("{}{body}{}", " ".repeat(pad), " ".repeat(tail))
}

fn status_line(view: &PlaybackView<'_>) -> String {
    let mut position = [0u8; 24];
    format!(
        "{:>4} wpm  p{}  {}  {:.0}%  {} left  [{}]",
        view.current_wpm.round() as u32,
        view.current_page_num,
        position_label(view.current_token_index, view.total_tokens, &mut position),
        view.progress_percent,
        view.time_remaining_label,
        view.state.as_str()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rsvp_core::{TokenKind, extract::ExtractedPage, tokenizer::generate_token_stream};

    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        generate_token_stream(&BTreeMap::from([(1, ExtractedPage::from_text(text))]), "doc")
    }

    #[test]
    fn orp_character_is_pinned_to_one_column() {
        for token in tokens("a running extraordinarily") {
            let line = token_line(&token);
            if !should_apply_orp(&token) {
                continue;
            }
            let highlight_at = line.find(HIGHLIGHT).unwrap();
            let prefix = &line[..highlight_at];
            assert_eq!(prefix.chars().count(), ORP_COLUMN);
        }
    }

    #[test]
    fn punctuation_starts_at_the_column_without_highlight() {
        let stream = tokens("wait \u{2014} what");
        let dash = stream
            .iter()
            .find(|t| t.kind == TokenKind::Punctuation)
            .unwrap();
        let line = token_line(dash);
        assert!(!line.contains(HIGHLIGHT));
        assert_eq!(line.chars().take_while(|c| *c == ' ').count(), ORP_COLUMN);
    }
}
