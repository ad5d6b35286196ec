//! Reply text helpers shared by command dispatch
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Generic reply texts for failed commands and autocomplete
//! - 1.0.0: Message-limit truncation

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Reply sent when a handler returns an error
pub const EXECUTION_FAILED: &str = "Something went wrong executing the command";

/// Truncate text to `limit` bytes on a char boundary, adding an ellipsis if cut
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    let mut end = limit.saturating_sub(3);
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Truncate text to fit the message limit
pub fn truncate_for_message(text: &str) -> String {
    truncate(text, MESSAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_for_message("short text"), "short text");
    }

    #[test]
    fn test_truncate_long_text() {
        let result = truncate_for_message(&"a".repeat(5000));
        assert!(result.len() <= MESSAGE_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_utf8_safety() {
        let text = "世界".repeat(10);
        let result = truncate(&text, 10);
        assert!(result.len() <= 10);
        assert!(result.ends_with("..."));
        assert!(result.starts_with('世'));
    }

    #[test]
    fn test_exactly_at_limit() {
        let text = "a".repeat(MESSAGE_LIMIT);
        assert_eq!(truncate_for_message(&text).len(), MESSAGE_LIMIT);
    }
}
