//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after the greeting
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state. LOGOUT is
//! valid everywhere and consumes the client; dropping a client closes its
//! socket.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::states::{Authenticated, MailboxStatus, NotAuthenticated, Selected};
use super::config::Timeouts;
use super::framed::{FramedStream, ResponseAccumulator, ServerResponse};
use crate::command::{Command, TagGenerator};
use crate::transcript::{Direction, Transcript};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tags: TagGenerator,
    pub(crate) fetch_tags: TagGenerator,
    pub(crate) timeouts: Timeouts,
    pub(crate) greeting: String,
    pub(crate) transcript: Option<Transcript>,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("fetch_tags", &self.fetch_tags)
            .field("timeouts", &self.timeouts)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server greeting line.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Returns the operation timeouts in effect.
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Starts recording a protocol transcript of up to `capacity` lines.
    ///
    /// The server greeting, read before recording could start, opens the
    /// transcript. Replaces any transcript already being recorded.
    pub fn enable_transcript(&mut self, capacity: usize) {
        let mut transcript = Transcript::new(capacity);
        transcript.record(Direction::Received, self.greeting.clone());
        self.transcript = Some(transcript);
    }

    /// Returns the transcript recorded so far, if enabled.
    #[must_use]
    pub const fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Detaches the transcript, leaving recording disabled.
    pub fn take_transcript(&mut self) -> Option<Transcript> {
        self.transcript.take()
    }

    /// Issues `command` with the next command tag and collects its responses.
    ///
    /// Returns every response line up to and including the tagged `OK`.
    /// A tagged `NO` or `BAD` becomes [`Error::Imap`] carrying that line.
    pub async fn run_command(&mut self, command: &Command) -> Result<Vec<String>> {
        let tag = self.tags.next();
        self.send(command, &tag).await?;

        let timeout = self.timeouts.command;
        let responses = self.read_until_tagged(&tag, timeout).await?;
        let status = responses
            .last()
            .and_then(|r| r.status_after(&tag))
            .map(str::to_ascii_uppercase);
        let lines: Vec<String> = responses.into_iter().map(|r| r.text).collect();
        let last = lines.last().cloned().unwrap_or_default();

        match status.as_deref() {
            Some("OK") => Ok(lines),
            Some("NO" | "BAD") => {
                debug!("{tag} failed: {last}");
                Err(Error::Imap(last))
            }
            _ => Err(Error::Protocol(format!("unexpected completion: {last}"))),
        }
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// The server's reply is awaited but not required; the socket is shut
    /// down either way.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tags.next();
        let sent = self.send(&Command::Logout, &tag).await;
        if sent.is_ok() {
            let timeout = self.timeouts.command;
            if let Err(e) = self.read_until_tagged(&tag, timeout).await {
                debug!("LOGOUT completion not received: {e}");
            }
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("shutdown after LOGOUT failed: {e}");
        }
        sent
    }

    pub(crate) async fn send(&mut self, command: &Command, tag: &str) -> Result<()> {
        let printable = command.redacted(tag);
        debug!("C: {printable}");
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.record(Direction::Sent, printable);
        }
        self.stream.write_command(&command.serialize(tag)).await
    }

    async fn read_until_tagged(
        &mut self,
        tag: &str,
        timeout: std::time::Duration,
    ) -> Result<Vec<ServerResponse>> {
        let transcript = &mut self.transcript;
        ResponseAccumulator::new(tag, timeout)
            .read_until_tagged(&mut self.stream, |response| {
                record_received(transcript, response);
            })
            .await
    }

    /// Moves the connection into another state.
    pub(crate) fn into_state<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tags: self.tags,
            fetch_tags: self.fetch_tags,
            timeouts: self.timeouts,
            greeting: self.greeting,
            transcript: self.transcript,
            state,
        }
    }
}

/// Logs a server response and appends it to the transcript, if any.
pub(crate) fn record_received(transcript: &mut Option<Transcript>, response: &ServerResponse) {
    debug!("S: {}", response.text);
    if let Some(transcript) = transcript.as_mut() {
        transcript.record(Direction::Received, response.text.clone());
    }
}
