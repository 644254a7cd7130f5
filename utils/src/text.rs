//! Provides helper methods to work with text shown in log output.

/// Ensures a string is at most `len` characters long.
/// If it exceeds the size, it is truncated, including an ellipsis at the end.
///
/// # Examples
///
/// ```
/// assert_eq!(utils::text::truncate("hello world", 6), "hello\u{2026}");
/// assert_eq!(utils::text::truncate("short", 10), "short");
/// ```
#[must_use]
pub fn truncate(str: impl Into<String>, len: usize) -> String {
    let str: String = str.into();
    if len == 0 { return String::new(); }
    if str.chars().count() <= len { return str; }

    str.chars().take(len - 1)
        .chain(std::iter::once('\u{2026}'))
        .collect()
}

/// Collapses a multi-line string into a single line suitable for a log message,
/// truncated to at most `len` characters.
///
/// # Examples
///
/// ```
/// let text = "<html>\r\n<body>";
/// assert_eq!(utils::text::preview(text, 40), "<html> <body>");
/// ```
#[must_use]
pub fn preview(str: &str, len: usize) -> String {
    let line = str
        .split(['\r', '\n'])
        .filter(|s| !s.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");

    truncate(line, len)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("äöüäöü", 6), "äöüäöü");
        assert_eq!(truncate("äöüäöü", 4), "äöü\u{2026}");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn preview_skips_blank_lines() {
        assert_eq!(preview("a\n\n  \nb\r\nc", 10), "a b c");
        assert_eq!(preview("first line\nsecond line", 8), "first l\u{2026}");
    }
}
