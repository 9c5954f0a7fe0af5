//! Truncation rules for persisted snippets and compact status labels.

use core::str;

pub const SNIPPET_MAX_WORDS: usize = 12;
pub const SNIPPET_MAX_CHARS: usize = 96;
/// Worst case: every char four bytes, plus the ellipsis.
pub const SNIPPET_BYTES: usize = SNIPPET_MAX_CHARS * 4 + 3;

/// Bounded copy of a context snippet, ending in `...` when cut.
pub fn snippet_limited(source: &str) -> String {
    let mut out = [0u8; SNIPPET_BYTES];
    preview_limited(source, &mut out, SNIPPET_MAX_WORDS, SNIPPET_MAX_CHARS).to_owned()
}

/// Copies at most `max_words` words and `max_chars` chars of `source` into
/// `out`, collapsing whitespace runs.
pub fn preview_limited<'a>(
    source: &str,
    out: &'a mut [u8],
    max_words: usize,
    max_chars: usize,
) -> &'a str {
    let mut len = 0usize;
    let mut chars = 0usize;
    let mut cut = false;

    'words: for (n, word) in source.split_whitespace().enumerate() {
        if n == max_words {
            cut = true;
            break;
        }

        let separator = if n == 0 { "" } else { " " };
        for ch in separator.chars().chain(word.chars()) {
            let width = ch.len_utf8();
            if chars == max_chars || len + width > out.len() {
                cut = true;
                break 'words;
            }
            ch.encode_utf8(&mut out[len..len + width]);
            len += width;
            chars += 1;
        }
    }

    if cut && len > 0 && len + 3 <= out.len() {
        out[len..len + 3].copy_from_slice(b"...");
        len += 3;
    }

    str::from_utf8(&out[..len]).unwrap_or("")
}

/// `"<index>/<total>"` with a 1-based index, e.g. `"12/340"`.
pub fn position_label(index: usize, total: usize, out: &mut [u8; 24]) -> &str {
    let mut len = write_u32_ascii(index.saturating_add(1).min(u32::MAX as usize) as u32, out);
    if len < out.len() {
        out[len] = b'/';
        len += 1;
    }
    len += write_u32_ascii(total.min(u32::MAX as usize) as u32, &mut out[len..]);
    str::from_utf8(&out[..len]).unwrap_or("")
}

pub fn write_u32_ascii(mut value: u32, out: &mut [u8]) -> usize {
    if out.is_empty() {
        return 0;
    }

    if value == 0 {
        out[0] = b'0';
        return 1;
    }

    let mut tmp = [0u8; 10];
    let mut n = 0usize;
    while value > 0 && n < tmp.len() {
        tmp[n] = b'0' + (value % 10) as u8;
        value /= 10;
        n += 1;
    }

    let len = n.min(out.len());
    for i in 0..len {
        out[i] = tmp[n - 1 - i];
    }
    len
}
