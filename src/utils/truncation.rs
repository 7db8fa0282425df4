const MAX_VALUE_CHARS: usize = 120;
const MAX_ERROR_CHARS: usize = 2_000;

/// Shorten a field value for one-line display.
pub fn truncate_value(value: &str) -> String {
    truncate_chars(value, MAX_VALUE_CHARS)
}

/// Bound error bodies carried inside error messages.
pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_values_untouched() {
        assert_eq!(truncate_value("example.com"), "example.com");
    }

    #[test]
    fn test_long_values_cut_with_ellipsis() {
        let long = "a".repeat(500);
        let cut = truncate_value(&long);
        assert_eq!(cut.len(), MAX_VALUE_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_cut_respects_char_boundaries() {
        let text = "é".repeat(MAX_ERROR_CHARS + 10);
        let cut = truncate_error(&text);
        assert_eq!(cut.chars().count(), MAX_ERROR_CHARS + 3);
    }
}
