//! Ingestion settings.

use serde::{Deserialize, Serialize};

use mailpost_imap::{Config, Security};

use crate::{Error, Result};

/// How the IMAP connection is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// TLS from the first byte (usually port 993).
    #[default]
    Ssl,
    /// Plaintext, upgraded with STARTTLS (usually port 143).
    Tls,
    /// No encryption.
    None,
}

impl From<Encryption> for Security {
    fn from(encryption: Encryption) -> Self {
        match encryption {
            Encryption::Ssl => Self::Implicit,
            Encryption::Tls => Self::StartTls,
            Encryption::None => Self::None,
        }
    }
}

/// Status given to created posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Saved for review.
    #[default]
    Draft,
    /// Published immediately.
    Publish,
}

impl PostStatus {
    /// Returns the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Publish => "publish",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the pipeline needs to know, supplied by the caller.
///
/// The password is expected in clear text; storing it safely is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port.
    pub port: u16,
    /// Connection encryption.
    pub encryption: Encryption,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Folder to scan.
    pub folder: String,
    /// Only consider mail from [`Settings::qualified_senders`].
    pub filter_senders: bool,
    /// Sender addresses accepted when filtering is on.
    pub qualified_senders: Vec<String>,
    /// Status of created posts.
    pub post_status: PostStatus,
    /// Category assigned to created posts.
    pub category: Option<u64>,
    /// Address told about each new post.
    pub notify_email: Option<String>,
    /// Minutes between cycles when run on a schedule.
    pub check_interval_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 993,
            encryption: Encryption::Ssl,
            username: String::new(),
            password: String::new(),
            folder: "INBOX".to_string(),
            filter_senders: false,
            qualified_senders: Vec::new(),
            post_status: PostStatus::Draft,
            category: None,
            notify_email: None,
            check_interval_minutes: 60,
        }
    }
}

impl Settings {
    /// Checks that host, username and password are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSettings`] naming every empty field.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingSettings(missing.join(", ")))
        }
    }

    /// Returns trimmed, non-empty sender addresses in configured order.
    pub fn senders(&self) -> impl Iterator<Item = &str> {
        self.qualified_senders
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Returns true when scanning should search per sender.
    #[must_use]
    pub fn uses_sender_filter(&self) -> bool {
        self.filter_senders && self.senders().next().is_some()
    }

    /// Builds the IMAP connection configuration.
    #[must_use]
    pub fn imap_config(&self) -> Config {
        Config::builder(self.host.trim())
            .port(self.port)
            .security(self.encryption.into())
            .build()
    }
}
