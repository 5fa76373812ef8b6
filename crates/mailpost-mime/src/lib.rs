//! # mailpost-mime
//!
//! Lenient MIME decoding for newsletter ingestion.
//!
//! ## Features
//!
//! - **Header parsing**: unfolds continuation lines into a case-insensitive map
//! - **RFC 2047**: decodes `=?charset?Q|B?...?=` encoded-words in header values
//! - **Transfer encodings**: Base64, Quoted-Printable and passthrough
//! - **HTML extraction**: finds the `text/html` body, descending into nested multiparts
//! - **Charsets**: converts declared charsets to UTF-8
//!
//! Decoders here never fail on malformed mail. Bad input yields empty or
//! partial output so that one broken message cannot stop a mailbox scan.
//!
//! ## Quick Start
//!
//! ```
//! use mailpost_mime::{Headers, decode_mime_header, extract_html};
//!
//! let head = "Subject: =?UTF-8?Q?Weekly_Digest?=\r\nContent-Type: text/html\r\n";
//! let headers = Headers::parse(head);
//! assert_eq!(decode_mime_header(headers.get("subject").unwrap()), "Weekly Digest");
//!
//! let raw = format!("{head}\r\n<p>Hello</p>");
//! assert_eq!(extract_html(raw.as_bytes()), "<p>Hello</p>");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod error;
mod extract;
mod header;

pub mod encoding;

pub use charset::{decode_text, decode_text_ignoring_invalid};
pub use content_type::ContentType;
pub use encoding::{TransferEncoding, decode_mime_header};
pub use error::{Error, Result};
pub use extract::{MAX_DEPTH, extract_html, find_html_in_multipart};
pub use header::Headers;
