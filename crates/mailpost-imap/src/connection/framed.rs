//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with support for literals.
//! This module provides buffered reading and writing with proper
//! handling of the IMAP framing.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// One complete server response.
///
/// A response is a CRLF-terminated line which may be interrupted by one or
/// more `{N}` literals. The text keeps the `{N}` markers but not the literal
/// payloads, which are collected separately in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerResponse {
    /// Response text with CRLFs removed and literals elided.
    pub text: String,
    /// Literal payloads, in order.
    pub literals: Vec<Bytes>,
}

impl ServerResponse {
    /// Returns true if this is the tagged completion for `tag`.
    #[must_use]
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.text
            .strip_prefix(tag)
            .is_some_and(|rest| rest.starts_with(' '))
    }

    /// Returns the completion status word (`OK`, `NO`, `BAD`) after the tag.
    #[must_use]
    pub fn status_after(&self, tag: &str) -> Option<&str> {
        self.text
            .strip_prefix(tag)?
            .trim_start()
            .split_whitespace()
            .next()
    }
}

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and buffered writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads a complete IMAP response, handling literals.
    ///
    /// Stream closure and read failures are reported as [`Error::Read`].
    pub async fn read_response(&mut self) -> Result<ServerResponse> {
        let mut response = ServerResponse::default();

        loop {
            let line = self.read_line().await?;
            let literal_len = parse_literal_length(&line);

            let text = line.strip_suffix(b"\r\n").unwrap_or(&line);
            response.text.push_str(&String::from_utf8_lossy(text));

            // Check for literal at end of line: {123} or {123+}
            let Some(literal_len) = literal_len else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }
            let mut literal = vec![0u8; literal_len];
            self.reader
                .read_exact(&mut literal)
                .await
                .map_err(|e| read_error(&e))?;
            response.literals.push(Bytes::from(literal));
            // The response continues on the line after the literal.
        }

        Ok(response)
    }

    /// Reads a response, giving up after `timeout` of silence.
    pub async fn read_response_within(&mut self, timeout: Duration) -> Result<ServerResponse> {
        tokio::time::timeout(timeout, self.read_response())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Reads a single CRLF-terminated line.
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await.map_err(|e| read_error(&e))?;
            if buf.is_empty() {
                return Err(Error::Read("connection closed".to_string()));
            }

            // A CR at the end of the previous chunk may pair with LF here.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                break;
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                break;
            }

            // No CRLF found, consume all and continue
            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Writes a command to the stream.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Shuts down the write half of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn read_error(e: &io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Read("connection closed".to_string())
    } else {
        Error::Read(e.to_string())
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;

    let open = line.iter().rposition(|&b| b == b'{')?;
    let inner = line[open + 1..].strip_suffix(b"}")?;
    let digits = inner.strip_suffix(b"+").unwrap_or(inner);

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// A response reader that accumulates responses until a tagged response.
pub struct ResponseAccumulator {
    tag: String,
    idle_timeout: Duration,
}

impl ResponseAccumulator {
    /// Creates a new response accumulator for the given tag.
    pub fn new(tag: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            tag: tag.into(),
            idle_timeout,
        }
    }

    /// Reads responses until a tagged response matching our tag is found.
    ///
    /// `observe` sees each response as it arrives. The tagged response is the
    /// last element of the returned vector.
    pub async fn read_until_tagged<S, F>(
        &self,
        framed: &mut FramedStream<S>,
        mut observe: F,
    ) -> Result<Vec<ServerResponse>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        F: FnMut(&ServerResponse),
    {
        let mut responses = Vec::new();
        loop {
            let response = framed.read_response_within(self.idle_timeout).await?;
            observe(&response);
            let is_tagged = response.is_tagged(&self.tag);
            responses.push(response);
            if is_tagged {
                return Ok(responses);
            }
        }
    }
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
    use tokio_test::io::Builder;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"{999999}\r\n"), Some(999_999));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[test]
    fn test_tag_matching() {
        let response = ServerResponse {
            text: "A0001 OK LOGIN completed".to_string(),
            literals: Vec::new(),
        };
        assert!(response.is_tagged("A0001"));
        assert!(!response.is_tagged("A000"));
        assert!(!response.is_tagged("A0002"));
        assert_eq!(response.status_after("A0001"), Some("OK"));
    }

    #[tokio::test]
    async fn test_framed_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response.text, "* OK ready");
        assert!(response.literals.is_empty());
    }

    #[tokio::test]
    async fn test_framed_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[HEADER] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response.text, "* 1 FETCH (BODY[HEADER] {5})");
        assert_eq!(response.literals, vec![Bytes::from_static(b"hello")]);
    }

    #[tokio::test]
    async fn test_literal_may_contain_crlf() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {7}\r\na\r\n\r\nb)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response.literals[0].as_ref(), b"a\r\n\r\nb");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK split\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response.text, "* OK split");
    }

    #[tokio::test]
    async fn test_closed_stream_is_read_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(matches!(result, Err(Error::Read(_))));
    }

    #[tokio::test]
    async fn test_framed_write_command() {
        let mock = Builder::new().write(b"A0001 LOGOUT\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A0001 LOGOUT\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_response_accumulator() {
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 1] ok\r\n")
            .read(b"A0002 OK SELECT completed\r\n")
            .build();

        let mut framed = FramedStream::new(mock);
        let accumulator = ResponseAccumulator::new("A0002", Duration::from_secs(5));

        let mut seen = 0;
        let responses = accumulator
            .read_until_tagged(&mut framed, |_| seen += 1)
            .await
            .unwrap();

        assert_eq!(seen, 3);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].text, "* 3 EXISTS");
        assert_eq!(responses[2].text, "A0002 OK SELECT completed");
    }

    #[tokio::test]
    async fn test_accumulator_times_out_when_silent() {
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r\n")
            .wait(Duration::from_secs(10))
            .build();
        let mut framed = FramedStream::new(mock);
        let accumulator = ResponseAccumulator::new("A0002", Duration::from_millis(50));

        let result = accumulator.read_until_tagged(&mut framed, |_| {}).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let literal_size = MAX_LITERAL_SIZE + 1;
        let header = format!("* 1 FETCH (BODY {{{literal_size}}}\r\n");

        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("literal too large")
        );
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }
}
