use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Number of display columns a string occupies.
pub(crate) fn display_width(content: &str) -> usize {
    UnicodeWidthStr::width(content)
}

/// Number of display columns a single character occupies. Control
/// characters count as zero.
pub(crate) fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Longest prefix of `content` that fits in `max` columns, cut on grapheme
/// boundaries.
pub(crate) fn truncate_to_width(content: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, grapheme) in content.grapheme_indices(true) {
        let w = UnicodeWidthStr::width(grapheme);
        if used + w > max {
            return &content[..idx];
        }
        used += w;
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("hello", 3), "hel");
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello", 0), "");
    }

    #[test]
    fn test_truncate_keeps_combining_marks() {
        // "e" + combining acute is one column wide.
        assert_eq!(truncate_to_width("e\u{301}x", 1), "e\u{301}");
    }

    #[test]
    fn test_wide_char_not_split() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(truncate_to_width("日本", 3), "日");
    }
}
