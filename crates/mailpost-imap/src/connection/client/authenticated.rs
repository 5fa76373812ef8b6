//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, MailboxStatus, Selected};
use crate::Result;
use crate::command::Command;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox.
    ///
    /// Returns a client in the selected state along with the mailbox status.
    /// On failure the client is dropped, which closes the connection.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let lines = self
            .run_command(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await?;

        let status = MailboxStatus::from_lines(lines.iter().map(String::as_str));
        debug!("selected {mailbox}: {} message(s)", status.exists);

        let client = self.into_state(Selected::new(mailbox, status));
        Ok((client, status))
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
    use tokio_test::io::Builder;

    use crate::{Client, Error};

    #[tokio::test]
    async fn test_select_reports_exists() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"u\" \"p\"\r\n")
            .read(b"A0001 OK\r\n")
            .write(b"A0002 SELECT \"Newsletters\"\r\n")
            .read(b"* 12 EXISTS\r\n* 0 RECENT\r\nA0002 OK [READ-WRITE] SELECT completed\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("u", "p").await.unwrap();
        let (client, status) = client.select("Newsletters").await.unwrap();

        assert_eq!(status.exists, 12);
        assert_eq!(client.state.mailbox(), "Newsletters");
    }

    #[tokio::test]
    async fn test_select_failure_is_imap_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN \"u\" \"p\"\r\n")
            .read(b"A0001 OK\r\n")
            .write(b"A0002 SELECT \"Missing\"\r\n")
            .read(b"A0002 NO Mailbox does not exist\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("u", "p").await.unwrap();
        let result = client.select("Missing").await;

        assert!(matches!(result, Err(Error::Imap(line)) if line.contains("does not exist")));
    }
}
