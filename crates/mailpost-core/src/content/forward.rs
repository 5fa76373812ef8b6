//! Unwrapping newsletters that were forwarded from a mail client.
//!
//! A forwarded newsletter arrives inside a cite-quote (`<blockquote
//! type="cite">`) preceded by the client's header summary. Only the original
//! newsletter markup is wanted.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::compile;

fn cite_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r#"(?i)<blockquote\b[^>]*\btype\s*=\s*["']?cite["']?[^>]*>"#))
}

fn blockquote_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)<(/?)blockquote\b[^>]*>"))
}

fn forward_marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        compile(
            r"(?is)<(?:div|p|span)\b[^>]*>\s*Begin forwarded message:?\s*</(?:div|p|span)>|Begin forwarded message:?",
        )
    })
}

fn soft_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        compile(r#"(?i)<br\b[^>]*\bclass\s*=\s*["']?Apple-interchange-newline["']?[^>]*>"#)
    })
}

/// `<div><span><b>From: </b></span>value</div>` and friends.
fn header_block_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        compile(
            r"(?is)<div\b[^>]*>\s*(?:<span\b[^>]*>\s*)?<(?:b|strong)\b[^>]*>\s*(?:From|Subject|Date|To|Reply-To|Cc|Bcc)\s*:\s*</(?:b|strong)>.*?</div>",
        )
    })
}

fn leading_breaks_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)^(?:\s*<br\b[^>]*>)+"))
}

fn body_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?is)<body\b[^>]*>(.*)</body>"))
}

fn block_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)^<(div|section|article)\b[^>]*>"))
}

fn block_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)<(/?)(div|section|article)\b[^>]*>"))
}

/// Returns the newsletter markup from a possibly forwarded message body.
///
/// When a cite-quote is present its content is taken, the forwarding
/// marker, soft-break markers and header summary blocks (`From`, `Subject`,
/// `Date`, `To`, `Reply-To`, `Cc`, `Bcc`) are removed together with their
/// values, leading `<br>`s are dropped and one enclosing block element is
/// unwrapped. Otherwise the inner content of `<body>` is returned, or the
/// input unchanged when there is no body element.
#[must_use]
pub fn extract_forwarded_content(html: &str) -> String {
    if let Some(quoted) = cite_quote_content(html) {
        debug!("unwrapping forwarded cite-quote");
        return strip_forward_headers(quoted);
    }

    if let Some(body) = body_regex().captures(html).and_then(|c| c.get(1)) {
        return body.as_str().trim().to_string();
    }

    html.to_string()
}

/// Inner markup of the first cite blockquote, up to its matching close.
fn cite_quote_content(html: &str) -> Option<&str> {
    let open = cite_open_regex().find(html)?;
    let rest = &html[open.end()..];

    let mut depth = 1usize;
    for tag in blockquote_tag_regex().captures_iter(rest) {
        let (Some(whole), closing) = (tag.get(0), tag.get(1).is_some_and(|m| !m.is_empty()))
        else {
            continue;
        };
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(&rest[..whole.start()]);
            }
        } else {
            depth += 1;
        }
    }

    // Unterminated quote: everything after it.
    Some(rest)
}

fn strip_forward_headers(quoted: &str) -> String {
    let content = forward_marker_regex().replace_all(quoted, "");
    let content = soft_break_regex().replace_all(&content, "");
    let content = header_block_regex().replace_all(&content, "");
    let content = leading_breaks_regex().replace(&content, "");
    let content = content.trim();

    unwrap_single_block(content).unwrap_or(content).trim().to_string()
}

/// Inner markup when `html` is exactly one `div`, `section` or `article`.
fn unwrap_single_block(html: &str) -> Option<&str> {
    let open = block_open_regex().captures(html)?;
    let name = open.get(1)?.as_str();
    let open_end = open.get(0)?.end();

    let mut depth = 0usize;
    for tag in block_tag_regex().captures_iter(html) {
        let (Some(whole), Some(tag_name)) = (tag.get(0), tag.get(2)) else {
            continue;
        };
        if !tag_name.as_str().eq_ignore_ascii_case(name) {
            continue;
        }
        if tag.get(1).is_some_and(|m| !m.is_empty()) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return (whole.end() == html.len()).then(|| &html[open_end..whole.start()]);
            }
        } else {
            depth += 1;
        }
    }

    None
}
