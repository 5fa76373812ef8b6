//! Charset conversion to UTF-8.

use encoding_rs::Encoding;

/// Decodes `bytes` from the named charset into a UTF-8 string.
///
/// Unknown or absent charsets are treated as UTF-8. Malformed sequences
/// become U+FFFD rather than errors.
#[must_use]
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .map(normalize_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    match encoding {
        Some(encoding) if encoding != encoding_rs::UTF_8 => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes `bytes` like [`decode_text`] but drops characters that could not
/// be represented instead of substituting U+FFFD.
#[must_use]
pub fn decode_text_ignoring_invalid(bytes: &[u8], charset: Option<&str>) -> String {
    let mut text = decode_text(bytes, charset);
    text.retain(|c| c != char::REPLACEMENT_CHARACTER);
    text
}

/// Strips quotes and an RFC 2231 language suffix (`utf-8*en`).
fn normalize_label(label: &str) -> &str {
    let label = label.trim().trim_matches('"');
    label.split_once('*').map_or(label, |(charset, _)| charset)
}
