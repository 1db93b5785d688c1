//! UTF-8-safe text shortening helpers for terminal output.

/// Truncate by characters and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_chars(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    format!("{prefix}{suffix}")
}

/// Flatten newlines to spaces and cap at `max_chars` with a trailing `...`.
pub fn truncate_single_line(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    truncate_with_suffix_by_chars(&flat, max_chars, "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_with_suffix_by_chars("hello", 10, "..."), "hello");
    }

    #[test]
    fn multibyte_text_is_cut_by_chars() {
        assert_eq!(
            truncate_with_suffix_by_chars("张三李四王五", 2, "…"),
            "张三…"
        );
    }

    #[test]
    fn single_line_flattens_newlines() {
        assert_eq!(truncate_single_line("a\nb\r\nc", 20), "a b  c");
        assert_eq!(truncate_single_line("abcdef", 3), "abc...");
    }
}
