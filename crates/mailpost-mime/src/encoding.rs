//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header decoding. Every
//! decoder here is lenient: malformed input yields empty or partial output
//! instead of an error, because a newsletter with a broken part should be
//! skipped, not crash the caller.

use std::sync::OnceLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::{Captures, Regex};

use crate::charset::decode_text_ignoring_invalid;

/// Base64 engine that accepts missing padding and stray trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// `=?charset?Q|B?text?=`
#[allow(clippy::expect_used)]
fn encoded_word_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)=\?([^?]+)\?([QB])\?([^?]*)\?=").expect("valid encoded-word regex")
    })
}

/// Content-Transfer-Encoding of a body or part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// `base64`.
    Base64,
    /// `quoted-printable`.
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, absent or unrecognized: bytes pass through.
    #[default]
    Identity,
}

impl TransferEncoding {
    /// Interprets a `Content-Transfer-Encoding` header value.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Identity;
        };
        let token = value.split_whitespace().next().unwrap_or_default();
        if token.eq_ignore_ascii_case("base64") {
            Self::Base64
        } else if token.eq_ignore_ascii_case("quoted-printable") {
            Self::QuotedPrintable
        } else {
            Self::Identity
        }
    }

    /// Decodes `body` according to this encoding.
    #[must_use]
    pub fn decode(self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => decode_base64(body),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::Identity => body.to_vec(),
        }
    }
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, skipping line breaks and other non-alphabet bytes.
///
/// Returns an empty vector if what remains is not decodable.
#[must_use]
pub fn decode_base64(data: &[u8]) -> Vec<u8> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect();
    LENIENT.decode(cleaned).unwrap_or_default()
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// `=XX` becomes the byte `0xXX`, `=` at the end of a line is a soft line
/// break, and an `=` not followed by two hex digits is kept literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        match data.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => i += 3,
            Some([b'\n', ..]) => i += 2,
            Some([hi, lo, ..]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                result.push((hex_value(*hi) << 4) | hex_value(*lo));
                i += 3;
            }
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

/// Decodes every RFC 2047 encoded-word in a header value.
///
/// Text between encoded words passes through unchanged, so mixed values
/// such as `Re: =?UTF-8?B?...?= Update` decode naturally. For `Q` words an
/// underscore stands for a space. Decoded bytes are converted from the
/// declared charset to UTF-8, dropping characters that cannot be
/// represented.
#[must_use]
pub fn decode_mime_header(text: &str) -> String {
    encoded_word_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let charset = &caps[1];
            let encoded = caps[3].as_bytes();
            let bytes = if caps[2].eq_ignore_ascii_case("B") {
                decode_base64(encoded)
            } else {
                let spaced: Vec<u8> = encoded
                    .iter()
                    .map(|&b| if b == b'_' { b' ' } else { b })
                    .collect();
                decode_quoted_printable(&spaced)
            };
            decode_text_ignoring_invalid(&bytes, Some(charset))
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(encoded.as_bytes()), data);
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let decoded = decode_base64(b"PHA+SGVsbG8g\r\nV29ybGQ8L3A+\r\n");
        assert_eq!(decoded, b"<p>Hello World</p>");
    }

    #[test]
    fn test_base64_missing_padding() {
        assert_eq!(decode_base64(b"SGk"), b"Hi");
    }

    #[test]
    fn test_base64_garbage_is_empty() {
        assert!(decode_base64(b"A").is_empty());
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"Hello=20World=0D=0ANew=20Line");
        assert_eq!(decoded, b"Hello World\r\nNew Line");

        let decoded = decode_quoted_printable(b"H=C3=A9llo");
        assert_eq!(String::from_utf8(decoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_keeps_stray_equals() {
        assert_eq!(decode_quoted_printable(b"a=zz b="), b"a=zz b=");
        assert_eq!(decode_quoted_printable(b"x=3"), b"x=3");
    }

    #[test]
    fn test_transfer_encoding_from_header() {
        assert_eq!(TransferEncoding::from_header(Some("BASE64")), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header(Some(" quoted-printable ")),
            TransferEncoding::QuotedPrintable
        );
        for passthrough in ["7bit", "8bit", "binary", "x-uuencode", ""] {
            assert_eq!(
                TransferEncoding::from_header(Some(passthrough)),
                TransferEncoding::Identity
            );
        }
        assert_eq!(TransferEncoding::from_header(None), TransferEncoding::Identity);
    }

    #[test]
    fn test_identity_passthrough() {
        let body = b"<p>caf\xE9</p>";
        assert_eq!(TransferEncoding::Identity.decode(body), body);
    }

    #[test]
    fn test_mime_header_plain_text() {
        assert_eq!(decode_mime_header("Hello World"), "Hello World");
    }

    #[test]
    fn test_mime_header_base64_utf8() {
        let encoded = format!("=?UTF-8?B?{}?=", encode_base64("Héllo Wörld".as_bytes()));
        assert_eq!(decode_mime_header(&encoded), "Héllo Wörld");
    }

    #[test]
    fn test_mime_header_q_underscore() {
        assert_eq!(decode_mime_header("=?UTF-8?Q?Hello_World?="), "Hello World");
    }

    #[test]
    fn test_mime_header_case_insensitive_marker() {
        let encoded = format!("=?utf-8?b?{}?=", encode_base64(b"Test"));
        assert_eq!(decode_mime_header(&encoded), "Test");
    }

    #[test]
    fn test_mime_header_iso_8859_1() {
        assert_eq!(decode_mime_header("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_mime_header_mixed_encoded_and_plain() {
        let encoded = format!("Re: =?UTF-8?B?{}?= Update", encode_base64(b"Newsletter"));
        assert_eq!(decode_mime_header(&encoded), "Re: Newsletter Update");
    }

    #[test]
    fn test_mime_header_malformed_token_passes_through() {
        assert_eq!(decode_mime_header("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_mime_header("=?UTF-8?B?abc"), "=?UTF-8?B?abc");
    }

    proptest::proptest! {
        #[test]
        fn prop_base64_round_trip(data in proptest::collection::vec(proptest::num::u8::ANY, 0..512)) {
            let encoded = encode_base64(&data);
            proptest::prop_assert_eq!(TransferEncoding::Base64.decode(encoded.as_bytes()), data);
        }

        #[test]
        fn prop_identity_is_unchanged(data in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            proptest::prop_assert_eq!(TransferEncoding::Identity.decode(&data), data);
        }
    }
}
