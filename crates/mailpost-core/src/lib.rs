//! # mailpost-core
//!
//! Newsletter ingestion pipeline.
//!
//! This crate provides:
//! - Settings for the mailbox and the posts it produces
//! - Mailbox scanning over IMAP ([`MailboxScanner`])
//! - Forwarded-message unwrapping and HTML rewriting ([`content`])
//! - The processed Message-ID ledger ([`ledger`])
//! - The ingestion cycle tying it together ([`Ingestor`])
//!
//! Posts are created through a [`ContentSink`] supplied by the caller, and
//! the ledger is persisted through a [`LedgerStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod check;
pub mod content;
mod error;
mod ingest;
pub mod ledger;
mod scanner;
mod settings;
mod sink;

pub use check::check_connection;
pub use content::{clean_html, clean_subject, extract_forwarded_content};
pub use error::{Error, Result};
pub use ingest::{CycleSummary, Ingestor};
pub use ledger::{JsonFileLedger, LEDGER_CAPACITY, LedgerStore, MemoryLedger, ProcessedIds};
pub use scanner::{
    Connector, DEFAULT_SUBJECT, MailboxScanner, NewsletterItem, TcpConnector,
};
pub use settings::{Encryption, PostStatus, Settings};
pub use sink::{ContentSink, NewPost, PostId, PostNotice, SinkError};
