//! Parsing of the engine's multi-frame text dump.

use regex::Regex;
use std::sync::LazyLock;

/// Byte budget for text handed back to callers.
pub const MAX_TEXT_BYTES: usize = 50_000;

/// Appended when text was cut to [`MAX_TEXT_BYTES`].
pub const TRUNCATION_NOTICE: &str = "\n\n[output truncated: exceeded 50000 bytes]";

/// A line made only of dashes (ASCII or box-drawing) separates frames.
static FRAME_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*[-─]{10,}[ \t]*\r?$").expect("frame separator regex is valid")
});

/// Return the last non-empty frame, trimmed. Empty string when there is none.
pub fn last_frame(raw: &str) -> String {
    FRAME_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Cap `text` at [`MAX_TEXT_BYTES`] bytes and append the notice when cut.
///
/// The cut backs off to a char boundary so the result is always valid UTF-8.
pub fn truncate(text: String) -> String {
    if text.len() <= MAX_TEXT_BYTES {
        return text;
    }
    let mut cut = MAX_TEXT_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + TRUNCATION_NOTICE.len());
    out.push_str(&text[..cut]);
    out.push_str(TRUNCATION_NOTICE);
    out
}

/// Last frame of a raw dump, truncated for the caller.
pub fn extract(raw: &str) -> String {
    truncate(last_frame(raw))
}
