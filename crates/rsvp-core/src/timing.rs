//! Per-token display duration and reading-time estimates.

use core::fmt::Write as _;

use heapless::String as HeaplessString;

use crate::token::{Token, TokenKind};

/// Early-advance slack applied to every display deadline.
pub const TIMING_TOLERANCE_MS: u32 = 10;

const LONG_WORD_CHARS: usize = 13;
const MEDIUM_WORD_CHARS: usize = 8;
const LONG_WORD_PENALTY_MS: u32 = 100;
const MEDIUM_WORD_PENALTY_MS: u32 = 50;

pub const TIME_LABEL_BYTES: usize = 16;

/// Inputs of the natural-pacing model.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pacing {
    pub enabled: bool,
    pub comma_pause_ms: u32,
    pub period_pause_ms: u32,
}

/// `60000 / wpm`, rounded to whole milliseconds.
pub fn base_duration_ms(wpm: f32) -> u32 {
    (60_000.0 / wpm.max(1.0)).round() as u32
}

/// Display duration of `token` at `wpm`.
///
/// One punctuation pause is picked from the trailing character (sentence end,
/// then `;:`, then comma, then dash); the word-length penalty is added on top.
pub fn display_duration_ms(token: &Token, wpm: f32, pacing: Pacing) -> u32 {
    let base = base_duration_ms(wpm);
    if !pacing.enabled {
        return base;
    }

    let punctuation = match token.text.chars().last() {
        Some('.' | '!' | '?') => pacing.period_pause_ms,
        Some(';' | ':') => (pacing.period_pause_ms as f32 * 0.75).round() as u32,
        Some(',') => pacing.comma_pause_ms,
        Some('—' | '–' | '-') => pacing.comma_pause_ms.saturating_mul(2),
        _ => 0,
    };

    let length = if token.kind == TokenKind::Word {
        match token.text.chars().count() {
            n if n >= LONG_WORD_CHARS => LONG_WORD_PENALTY_MS,
            n if n >= MEDIUM_WORD_CHARS => MEDIUM_WORD_PENALTY_MS,
            _ => 0,
        }
    } else {
        0
    };

    base + punctuation + length
}

/// Whether a token shown for `elapsed_ms` has met its display duration.
pub const fn should_advance(elapsed_ms: u64, duration_ms: u32, tolerance_ms: u32) -> bool {
    elapsed_ms + tolerance_ms as u64 >= duration_ms as u64
}

/// Estimated reading time left for `remaining_tokens` at `wpm`.
pub fn time_remaining_ms(remaining_tokens: usize, wpm: f32) -> f64 {
    remaining_tokens as f64 * (60_000.0 / wpm.max(1.0) as f64)
}

/// `"42s"`, `"7 min"` or `"1.3 hrs"`, always rounding up.
pub fn time_remaining_label(remaining_tokens: usize, wpm: f32) -> HeaplessString<TIME_LABEL_BYTES> {
    let ms = time_remaining_ms(remaining_tokens, wpm);
    let mut out = HeaplessString::new();

    if ms < 60_000.0 {
        let _ = write!(out, "{}s", (ms / 1_000.0).ceil() as u64);
    } else if ms < 3_600_000.0 {
        let _ = write!(out, "{} min", (ms / 60_000.0).ceil() as u64);
    } else {
        let tenths = (ms / 360_000.0).ceil() as u64;
        if tenths % 10 == 0 {
            let _ = write!(out, "{} hrs", tenths / 10);
        } else {
            let _ = write!(out, "{}.{} hrs", tenths / 10, tenths % 10);
        }
    }

    out
}

/// `index / total * 100`, zero for an empty stream.
pub fn progress_percent(index: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    index as f32 / total as f32 * 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{extract::ExtractedPage, tokenizer::generate_token_stream};

    const PACED: Pacing = Pacing {
        enabled: true,
        comma_pause_ms: 50,
        period_pause_ms: 200,
    };

    fn token(text: &str) -> Token {
        let pages = BTreeMap::from([(1, ExtractedPage::from_text(text))]);
        generate_token_stream(&pages, "t").remove(0)
    }

    #[test]
    fn sentence_end_adds_period_pause() {
        assert_eq!(display_duration_ms(&token("hello."), 300.0, PACED), 400);
    }

    #[test]
    fn pacing_disabled_returns_base() {
        let off = Pacing {
            enabled: false,
            ..PACED
        };
        assert_eq!(display_duration_ms(&token("extraordinarily."), 600.0, off), 100);
    }

    #[test]
    fn punctuation_pauses_are_exclusive() {
        assert_eq!(display_duration_ms(&token("well;"), 300.0, PACED), 350);
        assert_eq!(display_duration_ms(&token("well,"), 300.0, PACED), 250);
        assert_eq!(display_duration_ms(&token("well—"), 300.0, PACED), 300);
        assert_eq!(display_duration_ms(&token("well?\""), 300.0, PACED), 200);
    }

    #[test]
    fn length_penalty_stacks_with_punctuation() {
        // 8 chars incl. comma
        assert_eq!(display_duration_ms(&token("running,"), 300.0, PACED), 300);
        assert_eq!(display_duration_ms(&token("incomprehensible."), 300.0, PACED), 500);
        // numbers never get the length penalty
        assert_eq!(display_duration_ms(&token("123456789"), 300.0, PACED), 200);
    }

    #[test]
    fn tolerance_allows_early_advance() {
        assert!(!should_advance(89, 100, 10));
        assert!(should_advance(90, 100, 10));
        assert!(should_advance(150, 100, 0));
    }

    #[test]
    fn time_labels_round_up() {
        assert_eq!(time_remaining_label(10, 300.0).as_str(), "2s");
        assert_eq!(time_remaining_label(301, 300.0).as_str(), "2 min");
        assert_eq!(time_remaining_label(18_000, 300.0).as_str(), "1 hrs");
        assert_eq!(time_remaining_label(19_000, 300.0).as_str(), "1.1 hrs");
        assert_eq!(time_remaining_label(0, 300.0).as_str(), "0s");
    }

    #[test]
    fn percent_of_empty_stream_is_zero() {
        assert_eq!(progress_percent(3, 0), 0.0);
        assert_eq!(progress_percent(25, 100), 25.0);
    }
}
