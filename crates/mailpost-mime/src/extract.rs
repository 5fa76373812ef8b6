//! Locating and decoding the `text/html` body of a raw message.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::charset::decode_text;
use crate::content_type::ContentType;
use crate::encoding::TransferEncoding;
use crate::header::Headers;

/// Maximum multipart nesting followed before giving up.
pub const MAX_DEPTH: usize = 10;

/// Extracts the HTML body from a raw RFC 822 message.
///
/// A top-level `text/html` body is decoded directly. A multipart body is
/// searched for the first `text/html` part, descending into nested
/// multiparts. Returns an empty string when the message has no header/body
/// separator, no HTML part, or an unsupported structure.
///
/// The returned HTML is transfer-decoded and converted to UTF-8 from the
/// part's declared charset.
#[must_use]
pub fn extract_html(raw: &[u8]) -> String {
    let Some((head, body)) = split_head_body(raw) else {
        debug!("message has no header/body separator");
        return String::new();
    };
    html_from_entity(&Headers::parse(&String::from_utf8_lossy(head)), body, 0)
}

/// Searches a multipart body for its first `text/html` part.
///
/// `boundary` is the bare boundary value, without the leading `--`.
#[must_use]
pub fn find_html_in_multipart(body: &[u8], boundary: &str) -> String {
    find_in_multipart(body, boundary, 1)
}

fn html_from_entity(headers: &Headers, body: &[u8], depth: usize) -> String {
    let Some(value) = headers.get("content-type") else {
        return String::new();
    };
    // Senders sometimes drop the `;` before parameters, which the typed
    // parse folds into the subtype.
    let parsed = ContentType::parse(value).ok();

    let is_html = parsed.as_ref().is_some_and(ContentType::is_html)
        || value.to_ascii_lowercase().contains("text/html");
    if is_html {
        let charset = parsed
            .as_ref()
            .and_then(ContentType::charset)
            .map(str::to_string)
            .or_else(|| scan_parameter(charset_regex(), value));
        return decode_part(headers, charset.as_deref(), body);
    }

    let boundary = parsed
        .as_ref()
        .and_then(ContentType::boundary)
        .map(str::to_string)
        .or_else(|| scan_parameter(boundary_regex(), value));
    match boundary {
        Some(boundary) => find_in_multipart(body, &boundary, depth + 1),
        None => String::new(),
    }
}

#[allow(clippy::expect_used)]
fn boundary_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)\bboundary\s*=\s*"?([^";\s]+)"?"#).expect("valid boundary regex")
    })
}

#[allow(clippy::expect_used)]
fn charset_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)\bcharset\s*=\s*"?([^";\s]+)"?"#).expect("valid charset regex")
    })
}

/// First capture of `regex` in a raw header value.
fn scan_parameter(regex: &Regex, value: &str) -> Option<String> {
    regex
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn find_in_multipart(body: &[u8], boundary: &str, depth: usize) -> String {
    if depth > MAX_DEPTH {
        warn!(depth, "multipart nesting too deep, giving up");
        return String::new();
    }

    let delimiter = format!("--{boundary}");
    for fragment in split_on(body, delimiter.as_bytes()) {
        let fragment = trim_leading_line_breaks(fragment);
        if fragment.is_empty() || fragment.starts_with(b"--") {
            continue;
        }
        let Some((head, part_body)) = split_head_body(fragment) else {
            continue;
        };

        let part_body = strip_trailing_line_break(part_body);
        let html = html_from_entity(
            &Headers::parse(&String::from_utf8_lossy(head)),
            part_body,
            depth,
        );
        if !html.is_empty() {
            return html;
        }
    }

    String::new()
}

fn decode_part(headers: &Headers, charset: Option<&str>, body: &[u8]) -> String {
    let encoding = TransferEncoding::from_header(headers.get("content-transfer-encoding"));
    decode_text(&encoding.decode(body), charset)
}

/// Splits at the first empty line, accepting CRLF or bare LF.
fn split_head_body(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\n' {
            let head = &raw[..i];
            let head = head.strip_suffix(b"\r").unwrap_or(head);
            let rest = &raw[i + 1..];
            if rest.starts_with(b"\n") {
                return Some((head, &rest[1..]));
            }
            if rest.starts_with(b"\r\n") {
                return Some((head, &rest[2..]));
            }
        }
        i += 1;
    }
    None
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        pieces.push(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
    }
    pieces.push(rest);
    pieces
}

fn trim_leading_line_breaks(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b'\r' | b'\n' | b' ' | b'\t'))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// The line break before a delimiter belongs to the delimiter.
fn strip_trailing_line_break(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_suffix(b"\r\n")
        .or_else(|| bytes.strip_suffix(b"\n"))
        .unwrap_or(bytes)
}
