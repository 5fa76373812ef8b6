//! # mailpost-imap
//!
//! A small IMAP4 client covering exactly what a newsletter poller needs:
//! greeting, STARTTLS, LOGIN, SELECT, SEARCH, FETCH of body sections,
//! STORE of the `\Seen` flag and LOGOUT.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_imap::{Config, SearchCriteria, Section, Security};
//!
//! #[tokio::main]
//! async fn main() -> mailpost_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let client = mailpost_imap::connect(&config).await?;
//!     let client = client.login("user@example.com", "password").await?;
//!
//!     let (mut client, status) = client.select("INBOX").await?;
//!     println!("Messages: {}", status.exists);
//!
//!     for seq in client.search(&SearchCriteria::All).await? {
//!         let header = client.fetch_section(seq, &Section::Header).await?;
//!         println!("{seq}: {} header bytes", header.len());
//!     }
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! The client uses the type-state pattern so that commands can only be
//! issued in the state where the protocol allows them:
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── starttls() ───→ NotAuthenticated (TLS)
//! └─────────────────────┘
//!            │ login()
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── search()/fetch_section()/store_seen()
//! └─────────────────────┘
//! ```
//!
//! `logout()` is available in every state and consumes the client.
//!
//! Exactly one command is in flight at a time. Each command round-trip is
//! bounded by an idle timeout (30 seconds by default) and each section fetch
//! by its own, longer one (60 seconds by default).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod transcript;

pub use command::{Command, SearchCriteria, Section, TagGenerator, quote_string};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, MailboxStatus,
    NotAuthenticated, ResponseAccumulator, Security, Selected, ServerResponse, Timeouts, connect,
};
pub use error::{Error, Result};
pub use transcript::{Direction, Transcript, TranscriptEntry};
