//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::config::Timeouts;
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream with default timeouts.
    ///
    /// Reads the server greeting, which must begin with `* OK`.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_stream_with(stream, Timeouts::default()).await
    }

    /// Creates a new client from a connected stream.
    ///
    /// A missing, unreadable or non-`OK` greeting is reported as
    /// [`Error::ConnectionFailed`].
    pub async fn from_stream_with(stream: S, timeouts: Timeouts) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed
            .read_response_within(timeouts.command)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("no greeting: {e}")))?;
        debug!("S: {}", greeting.text);

        if !greeting.text.starts_with("* OK") {
            return Err(Error::ConnectionFailed(format!(
                "unexpected greeting: {}",
                greeting.text
            )));
        }

        Ok(Self {
            stream: framed,
            tags: TagGenerator::commands(),
            fetch_tags: TagGenerator::fetches(),
            timeouts,
            greeting: greeting.text,
            transcript: None,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Both arguments are sent as quoted strings with `"` and `\` escaped.
    /// A tagged `NO` or `BAD` becomes [`Error::AuthFailed`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };

        match self.run_command(&command).await {
            Ok(_) => {}
            Err(Error::Imap(line)) => return Err(Error::AuthFailed(line)),
            Err(e) => return Err(e),
        }

        info!("logged in as {username}");
        Ok(self.into_state(Authenticated))
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection with STARTTLS.
    ///
    /// Issues the command and, once the server agrees, performs the TLS
    /// handshake on the same socket. Any failure is [`Error::TlsFailed`].
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        if let Err(e) = self.run_command(&Command::StartTls).await {
            return Err(Error::TlsFailed(e.to_string()));
        }

        let Self {
            stream,
            tags,
            fetch_tags,
            timeouts,
            greeting,
            transcript,
            state,
        } = self;

        let upgraded = tokio::time::timeout(timeouts.connect, stream.into_inner().upgrade_to_tls(host))
            .await
            .map_err(|_| Error::TlsFailed("TLS handshake timed out".to_string()))??;
        debug!("STARTTLS negotiated with {host}");

        Ok(Self {
            stream: FramedStream::new(upgraded),
            tags,
            fetch_tags,
            timeouts,
            greeting,
            transcript,
            state,
        })
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

    #[tokio::test]
    async fn test_greeting_accepted() {
        let mock = Builder::new().read(b"* OK IMAP4rev1 ready\r\n").build();
        let client = Client::from_stream(mock).await.unwrap();
        assert_eq!(client.greeting(), "* OK IMAP4rev1 ready");
    }

    #[tokio::test]
    async fn test_bad_greeting_is_connection_failed() {
        let mock = Builder::new().read(b"* BYE go away\r\n").build();
        let result = Client::from_stream(mock).await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_greeting_is_connection_failed() {
        let mock = Builder::new().build();
        let result = Client::from_stream(mock).await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"user\" \"pass\"\r\n")
            .read(b"A0001 OK LOGIN completed\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "pass").await.unwrap();
        assert_eq!(client.tags.peek(), 2);
    }

    #[tokio::test]
    async fn test_login_rejected_is_auth_failed() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"user\" \"wrong\"\r\n")
            .read(b"A0001 NO Authentication failed\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let result = client.login("user", "wrong").await;
        match result {
            Err(Error::AuthFailed(line)) => assert_eq!(line, "A0001 NO Authentication failed"),
            other => panic!("expected AuthFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_escapes_injection_attempt() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"a\\\" LOGOUT\" \"p\\\\w\"\r\n")
            .read(b"A0001 OK\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        client.login("a\" LOGOUT", "p\\w").await.unwrap();
    }
}
