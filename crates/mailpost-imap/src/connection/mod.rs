//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed I/O for IMAP protocol
//! - Type-state connection wrapper

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, MailboxStatus, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, Security, Timeouts};
pub use framed::{FramedStream, ResponseAccumulator, ServerResponse};
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};

use tracing::debug;

use crate::Result;

/// Opens a connection according to `config` and reads the greeting.
///
/// - [`Security::Implicit`]: TLS from the first byte.
/// - [`Security::StartTls`]: plaintext, then STARTTLS and a handshake on the
///   same socket.
/// - [`Security::None`]: plaintext throughout.
pub async fn connect(config: &Config) -> Result<Client<ImapStream, NotAuthenticated>> {
    let timeouts = config.timeouts;
    debug!("connecting to {} ({:?})", config.address(), config.security);

    match config.security {
        Security::Implicit => {
            let stream = connect_tls(&config.host, config.port, timeouts.connect).await?;
            Client::from_stream_with(stream, timeouts).await
        }
        Security::StartTls => {
            let stream = connect_plain(&config.host, config.port, timeouts.connect).await?;
            let client = Client::from_stream_with(stream, timeouts).await?;
            client.starttls(&config.host).await
        }
        Security::None => {
            let stream = connect_plain(&config.host, config.port, timeouts.connect).await?;
            Client::from_stream_with(stream, timeouts).await
        }
    }
}
