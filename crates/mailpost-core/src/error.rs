//! Error types for the core library.

use thiserror::Error;

/// Errors that can abort a scan or an ingestion cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration is absent; nothing was attempted.
    #[error("Missing settings: {0}")]
    MissingSettings(String),

    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailpost_imap::Error),

    /// The processed-ID ledger could not be loaded or saved.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
