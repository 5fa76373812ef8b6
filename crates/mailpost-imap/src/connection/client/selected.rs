//! Implementation for the selected state.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::states::Selected;
use super::{Client, record_received};
use crate::Result;
use crate::command::{Command, SearchCriteria, Section};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// Searches the mailbox and returns matching sequence numbers.
    ///
    /// Numbers are returned in the order the server listed them. Tokens on a
    /// `* SEARCH` line that are not numbers are ignored.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let lines = self.run_command(&Command::Search(criteria.clone())).await?;
        Ok(parse_search_results(&lines))
    }

    /// Fetches one body section of a message.
    ///
    /// Uses the fetch tag sequence (`F1001`, ...). The payload of the first
    /// `{N}` literal is returned; later lines are read and discarded until the
    /// tagged completion. If no literal arrives before the completion, or the
    /// server stays silent longer than the fetch timeout, or the stream
    /// breaks, an empty payload is returned instead of an error. Only a
    /// failure to send the command is an error.
    pub async fn fetch_section(&mut self, seq: u32, section: &Section) -> Result<Bytes> {
        let tag = self.fetch_tags.next();
        let command = Command::Fetch {
            seq,
            section: section.clone(),
        };
        self.send(&command, &tag).await?;

        let mut payload: Option<Bytes> = None;
        loop {
            let response = match self.stream.read_response_within(self.timeouts.fetch).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("FETCH {seq} BODY[{section}] ended early: {e}");
                    break;
                }
            };
            record_received(&mut self.transcript, &response);

            if payload.is_none() {
                payload = response.literals.first().cloned();
            }
            if response.is_tagged(&tag) {
                if response.status_after(&tag) != Some("OK") {
                    debug!("FETCH {seq} completed without OK: {}", response.text);
                }
                break;
            }
        }

        Ok(payload.unwrap_or_default())
    }

    /// Adds the `\Seen` flag to a message.
    pub async fn store_seen(&mut self, seq: u32) -> Result<()> {
        self.run_command(&Command::AddFlags {
            seq,
            flags: vec!["\\Seen".to_string()],
        })
        .await?;
        Ok(())
    }
}

/// Collects the numbers from every `* SEARCH` line.
fn parse_search_results(lines: &[String]) -> Vec<u32> {
    let mut results = Vec::new();
    for line in lines {
        let mut words = line.split_whitespace();
        if words.next() != Some("*") {
            continue;
        }
        if !words.next().is_some_and(|w| w.eq_ignore_ascii_case("SEARCH")) {
            continue;
        }
        results.extend(words.filter_map(|w| w.parse::<u32>().ok()));
    }
    results
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
    use std::time::Duration;
    use tokio_test::io::Builder;

    use crate::{Authenticated, Timeouts};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_search_results() {
        let result = parse_search_results(&lines(&["* SEARCH 2 3 5", "A0003 OK SEARCH done"]));
        assert_eq!(result, vec![2, 3, 5]);
    }

    #[test]
    fn test_parse_search_empty() {
        let result = parse_search_results(&lines(&["* SEARCH", "A0003 OK"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_search_ignores_junk() {
        let result = parse_search_results(&lines(&[
            "* SEARCH 4 x 9",
            "* 3 EXISTS",
            "* search 11",
            "A0003 OK",
        ]));
        assert_eq!(result, vec![4, 9, 11]);
    }

    async fn selected(
        mock: tokio_test::io::Mock,
        timeouts: Timeouts,
    ) -> Client<tokio_test::io::Mock, Selected> {
        let client = Client::from_stream_with(mock, timeouts).await.unwrap();
        let client: Client<_, Authenticated> = client.login("u", "p").await.unwrap();
        client.select("INBOX").await.unwrap().0
    }

    fn preamble() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"u\" \"p\"\r\n")
            .read(b"A0001 OK\r\n")
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"* 1 EXISTS\r\nA0002 OK\r\n");
        builder
    }

    #[tokio::test]
    async fn test_fetch_header_literal() {
        let mock = preamble()
            .write(b"F1001 FETCH 1 BODY[HEADER]\r\n")
            .read(b"* 1 FETCH (BODY[HEADER] {15}\r\nSubject: Hi\r\n\r\n)\r\n")
            .read(b"F1001 OK FETCH completed\r\n")
            .build();

        let mut client = selected(mock, Timeouts::default()).await;
        let header = client.fetch_section(1, &Section::Header).await.unwrap();
        assert_eq!(header.as_ref(), b"Subject: Hi\r\n\r\n".as_slice());
    }

    #[tokio::test]
    async fn test_fetch_without_literal_is_empty() {
        let mock = preamble()
            .write(b"F1001 FETCH 1 BODY[]\r\n")
            .read(b"* 1 FETCH (BODY[] NIL)\r\nF1001 OK\r\n")
            .build();

        let mut client = selected(mock, Timeouts::default()).await;
        let body = client.fetch_section(1, &Section::Full).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_empty() {
        let timeouts = Timeouts {
            fetch: Duration::from_millis(50),
            ..Timeouts::default()
        };
        let mock = preamble()
            .write(b"F1001 FETCH 1 BODY[]\r\n")
            .wait(Duration::from_secs(5))
            .build();

        let mut client = selected(mock, timeouts).await;
        let body = client.fetch_section(1, &Section::Full).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_store_seen() {
        let mock = preamble()
            .write(b"A0003 STORE 1 +FLAGS (\\Seen)\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen))\r\nA0003 OK STORE completed\r\n")
            .build();

        let mut client = selected(mock, Timeouts::default()).await;
        client.store_seen(1).await.unwrap();
    }
}
