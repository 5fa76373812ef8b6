//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The socket could not be opened or the server greeting was not `* OK`.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// STARTTLS was refused or the TLS handshake on the upgraded socket failed.
    #[error("TLS negotiation failed: {0}")]
    TlsFailed(String),

    /// LOGIN was rejected by the server.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Server answered a command with a tagged NO or BAD.
    ///
    /// Carries the full tagged line.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// No tagged completion arrived within the operation's time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The stream closed or became unreadable mid-response.
    #[error("Read error: {0}")]
    Read(String),

    /// I/O error while writing a command.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
