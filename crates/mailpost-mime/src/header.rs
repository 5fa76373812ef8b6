//! Header block parsing.

use std::collections::HashMap;

/// Parsed header block of a message or MIME part.
///
/// Names are stored lowercase. When a header repeats, the last non-empty
/// value wins; headers with an empty value are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: HashMap<String, String>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, replacing any existing value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().trim().to_ascii_lowercase(), value.into());
    }

    /// Gets the value for a header, matching the name case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the number of distinct headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if no headers were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over `(lowercase name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a header block.
    ///
    /// Continuation lines (starting with space or tab) are unfolded into
    /// the previous header with a single space. Parsing stops at the first
    /// empty line. Lines without a colon are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    let piece = line.trim();
                    if !piece.is_empty() {
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(piece);
                    }
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.insert_non_empty(&name, value);
            }

            current = line
                .split_once(':')
                .filter(|(name, _)| !name.trim().is_empty())
                .map(|(name, value)| (name.to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.insert_non_empty(&name, value);
        }

        headers
    }

    fn insert_non_empty(&mut self, name: &str, value: String) {
        let value = value.trim();
        if !value.is_empty() {
            self.set(name, value.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_parse() {
        let text = "From: sender@example.com\r\nTo: recipient@example.com\r\nSubject: Test\r\n";
        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("to"), Some("recipient@example.com"));
        assert_eq!(headers.get("SUBJECT"), Some("Test"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_headers_continuation() {
        let text = "Subject: This is a long\r\n subject line\r\n\tcontinued\r\n";
        let headers = Headers::parse(text);
        assert_eq!(
            headers.get("Subject"),
            Some("This is a long subject line continued")
        );
    }

    #[test]
    fn test_headers_folded_content_type() {
        let text = "Content-Type: multipart/alternative;\r\n\tboundary=\"abc\"\r\n";
        let headers = Headers::parse(text);
        assert_eq!(
            headers.get("content-type"),
            Some("multipart/alternative; boundary=\"abc\"")
        );
    }

    #[test]
    fn test_headers_last_value_wins() {
        let headers = Headers::parse("X-Tag: one\nX-Tag: two\n");
        assert_eq!(headers.get("x-tag"), Some("two"));
    }

    #[test]
    fn test_headers_empty_values_skipped() {
        let headers = Headers::parse("Subject:\nMessage-ID:   \nFrom: a@b\n");
        assert_eq!(headers.get("subject"), None);
        assert_eq!(headers.get("message-id"), None);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_empty_value_does_not_erase_earlier() {
        let headers = Headers::parse("Subject: first\nSubject:\n");
        assert_eq!(headers.get("subject"), Some("first"));
    }

    #[test]
    fn test_headers_stop_at_blank_line() {
        let headers = Headers::parse("Subject: Hi\r\n\r\nBody-Line: not a header\r\n");
        assert_eq!(headers.get("subject"), Some("Hi"));
        assert_eq!(headers.get("body-line"), None);
    }

    #[test]
    fn test_headers_value_keeps_colons() {
        let headers = Headers::parse("Date: Mon, 1 Jan 2024 10:00:00 +0000\n");
        assert_eq!(headers.get("date"), Some("Mon, 1 Jan 2024 10:00:00 +0000"));
    }

    #[test]
    fn test_headers_garbage_lines_skipped() {
        let headers = Headers::parse("not a header\n: no name\nX-Ok: yes\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-ok"), Some("yes"));
    }

    proptest::proptest! {
        #[test]
        fn prop_space_and_tab_folding_agree(a in "[A-Za-z0-9]{1,20}", b in "[A-Za-z0-9]{1,20}") {
            let spaced = Headers::parse(&format!("Subject: {a}\r\n {b}\r\n"));
            let tabbed = Headers::parse(&format!("Subject: {a}\r\n\t{b}\r\n"));
            proptest::prop_assert_eq!(spaced.get("subject"), tabbed.get("subject"));
            let expected = format!("{a} {b}");
            proptest::prop_assert_eq!(spaced.get("subject"), Some(expected.as_str()));
        }
    }
}
