#[cfg(test)]
mod tests {
    use tapectl_session::output::{self, MAX_TEXT_BYTES, TRUNCATION_NOTICE};

    const SEP: &str = "────────────────────────────────────────";

    // ── Frame extraction ───────────────────────────────────────

    #[test]
    fn test_last_frame_skips_trailing_empty_section() {
        let raw = format!("> ls\nfirst\n{SEP}\n> ls\nsecond\n{SEP}\n   \n\n");
        assert_eq!(output::last_frame(&raw), "> ls\nsecond");
    }

    #[test]
    fn test_last_frame_with_ascii_dashes() {
        let raw = "one\n------------\ntwo\n------------\n";
        assert_eq!(output::last_frame(raw), "two");
    }

    #[test]
    fn test_last_frame_without_separator_returns_whole_text() {
        assert_eq!(output::last_frame("\n  $ echo hi\n  hi\n"), "$ echo hi\n  hi");
    }

    #[test]
    fn test_last_frame_empty_input() {
        assert_eq!(output::last_frame(""), "");
        assert_eq!(output::last_frame(&format!("{SEP}\n\n{SEP}\n")), "");
    }

    #[test]
    fn test_short_dash_runs_are_content() {
        let raw = format!("a\n---\nb\n{SEP}\n");
        assert_eq!(output::last_frame(&raw), "a\n---\nb");
    }

    // ── Truncation ─────────────────────────────────────────────

    #[test]
    fn test_truncate_leaves_small_text_alone() {
        let text = "x".repeat(MAX_TEXT_BYTES);
        assert_eq!(output::truncate(text.clone()), text);
    }

    #[test]
    fn test_truncate_one_byte_over_budget() {
        let text = "x".repeat(MAX_TEXT_BYTES + 1);
        let out = output::truncate(text);
        assert_eq!(out.len(), MAX_TEXT_BYTES + TRUNCATION_NOTICE.len());
        assert!(out.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn test_truncate_backs_off_to_char_boundary() {
        // 49_999 ASCII bytes then a 3-byte char straddling the budget.
        let mut text = "x".repeat(MAX_TEXT_BYTES - 1);
        text.push('€');
        text.push_str("tail");
        let out = output::truncate(text);
        assert!(out.ends_with(TRUNCATION_NOTICE));
        assert_eq!(out.len(), MAX_TEXT_BYTES - 1 + TRUNCATION_NOTICE.len());
        assert!(!out.contains('€'));
    }

    #[test]
    fn test_extract_truncates_last_frame() {
        let big = "y".repeat(MAX_TEXT_BYTES * 2);
        let raw = format!("small\n{SEP}\n{big}\n");
        let out = output::extract(&raw);
        assert!(out.starts_with('y'));
        assert!(out.ends_with(TRUNCATION_NOTICE));
    }
}
