//! Low-level serialization helpers for command arguments.

/// Writes `s` as an IMAP quoted string.
///
/// `"` and `\` are backslash-escaped so the value can never terminate the
/// quoted string early and inject further command text.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Returns `s` as an IMAP quoted string.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut buf = Vec::with_capacity(s.len() + 2);
    write_quoted(&mut buf, s);
    // Only ASCII bytes were inserted, so the input's UTF-8 validity is preserved.
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote_string("INBOX"), "\"INBOX\"");
        assert_eq!(quote_string(""), "\"\"");
    }

    #[test]
    fn test_quote_escapes_quote_and_backslash() {
        assert_eq!(quote_string("evil\"@x.com"), "\"evil\\\"@x.com\"");
        assert_eq!(quote_string("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_quote_keeps_utf8() {
        assert_eq!(quote_string("Boîte"), "\"Boîte\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_quoted_never_breaks_out(s in ".*") {
            let quoted = quote_string(&s);
            let inner = &quoted[1..quoted.len() - 1];
            // Every quote inside must be escaped by an odd run of backslashes.
            let bytes = inner.as_bytes();
            let mut backslashes = 0usize;
            for &b in bytes {
                if b == b'"' {
                    proptest::prop_assert!(backslashes % 2 == 1);
                }
                if b == b'\\' {
                    backslashes += 1;
                } else {
                    backslashes = 0;
                }
            }
            proptest::prop_assert!(backslashes % 2 == 0);
        }
    }
}
