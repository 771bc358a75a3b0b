/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences that some models wrap around JSON answers.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Remove one layer of quotation marks wrapping the whole of generated post text.
///
/// The marks only count as wrapping when neither appears again inside, so a
/// text that merely starts and ends with separately quoted words is kept as is.
pub fn strip_wrapping_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\'')] {
        if trimmed.chars().count() < 2 || !trimmed.starts_with(open) || !trimmed.ends_with(close) {
            continue;
        }
        let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
        if inner.contains(open) || inner.contains(close) {
            return trimmed;
        }
        return inner.trim();
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn strips_straight_and_curly_quotes() {
        assert_eq!(strip_wrapping_quotes("\"much wow\""), "much wow");
        assert_eq!(strip_wrapping_quotes("\u{201C}such bark\u{201D}"), "such bark");
        assert_eq!(strip_wrapping_quotes("  no quotes  "), "no quotes");
    }

    #[test]
    fn leaves_unbalanced_quotes_alone() {
        assert_eq!(strip_wrapping_quotes("\"half open"), "\"half open");
        assert_eq!(strip_wrapping_quotes("\""), "\"");
    }

    #[test]
    fn keeps_separately_quoted_words_at_both_ends() {
        let text = "\"Buy\" the dip, they said \"safe\"";
        assert_eq!(strip_wrapping_quotes(text), text);

        let text = "'90s rates were 'normal'";
        assert_eq!(strip_wrapping_quotes(text), text);

        let text = "\u{201C}Moon\u{201D} soon, \u{201C}trust\u{201D}";
        assert_eq!(strip_wrapping_quotes(text), text);
    }
}
