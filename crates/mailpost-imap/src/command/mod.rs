//! IMAP command builder.
//!
//! Only the handful of commands a newsletter poller issues are modelled.

mod serialize;
mod tag_generator;

use std::fmt;

pub use serialize::quote_string;
pub use tag_generator::TagGenerator;

use serialize::write_quoted;

/// Search criteria for the SEARCH command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// Every message in the mailbox.
    All,
    /// Messages whose From header contains the given address.
    From(String),
}

/// Body section requested by FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// `BODY[HEADER]`: the header block only.
    Header,
    /// `BODY[]`: the whole message.
    Full,
    /// `BODY[1.2]`: a MIME part by part number.
    Part(String),
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("HEADER"),
            Self::Full => Ok(()),
            Self::Part(number) => f.write_str(number),
        }
    }
}

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// SEARCH command.
    Search(SearchCriteria),
    /// FETCH of a single body section.
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Section to fetch.
        section: Section,
    },
    /// STORE command adding flags.
    AddFlags {
        /// Message sequence number.
        seq: u32,
        /// Flags to add, e.g. `\Seen`.
        flags: Vec<String>,
    },
    /// LOGOUT command.
    Logout,
}

impl Command {
    /// Serializes the command with the given tag, CRLF-terminated.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_quoted(&mut buf, username);
                buf.push(b' ');
                write_quoted(&mut buf, password);
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_quoted(&mut buf, mailbox);
            }

            Self::Search(criteria) => {
                buf.extend_from_slice(b"SEARCH ");
                match criteria {
                    SearchCriteria::All => buf.extend_from_slice(b"ALL"),
                    SearchCriteria::From(sender) => {
                        buf.extend_from_slice(b"FROM ");
                        write_quoted(&mut buf, sender);
                    }
                }
            }

            Self::Fetch { seq, section } => {
                buf.extend_from_slice(format!("FETCH {seq} BODY[{section}]").as_bytes());
            }

            Self::AddFlags { seq, flags } => {
                buf.extend_from_slice(format!("STORE {seq} +FLAGS ({})", flags.join(" ")).as_bytes());
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns a printable form of the command, with credentials hidden.
    ///
    /// Used for tracing and the protocol transcript.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { .. } => format!("{tag} LOGIN <redacted>"),
            _ => {
                let bytes = self.serialize(tag);
                String::from_utf8_lossy(&bytes).trim_end().to_string()
            }
        }
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

    fn text(cmd: &Command, tag: &str) -> String {
        String::from_utf8(cmd.serialize(tag)).unwrap()
    }

    #[test]
    fn test_login_escapes_credentials() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pa\"ss\\word".to_string(),
        };
        assert_eq!(
            text(&cmd, "A0001"),
            "A0001 LOGIN \"user@example.com\" \"pa\\\"ss\\\\word\"\r\n"
        );
    }

    #[test]
    fn test_select_quotes_mailbox() {
        let cmd = Command::Select {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(text(&cmd, "A0002"), "A0002 SELECT \"INBOX\"\r\n");
    }

    #[test]
    fn test_search_all() {
        let cmd = Command::Search(SearchCriteria::All);
        assert_eq!(text(&cmd, "A0003"), "A0003 SEARCH ALL\r\n");
    }

    #[test]
    fn test_search_from_escapes_sender() {
        let cmd = Command::Search(SearchCriteria::From("evil\"@example.com".to_string()));
        assert_eq!(
            text(&cmd, "A0003"),
            "A0003 SEARCH FROM \"evil\\\"@example.com\"\r\n"
        );
    }

    #[test]
    fn test_fetch_sections() {
        let header = Command::Fetch {
            seq: 4,
            section: Section::Header,
        };
        let full = Command::Fetch {
            seq: 4,
            section: Section::Full,
        };
        let part = Command::Fetch {
            seq: 4,
            section: Section::Part("1.2".to_string()),
        };
        assert_eq!(text(&header, "F1001"), "F1001 FETCH 4 BODY[HEADER]\r\n");
        assert_eq!(text(&full, "F1002"), "F1002 FETCH 4 BODY[]\r\n");
        assert_eq!(text(&part, "F1003"), "F1003 FETCH 4 BODY[1.2]\r\n");
    }

    #[test]
    fn test_store_seen() {
        let cmd = Command::AddFlags {
            seq: 9,
            flags: vec!["\\Seen".to_string()],
        };
        assert_eq!(text(&cmd, "A0005"), "A0005 STORE 9 +FLAGS (\\Seen)\r\n");
    }

    #[test]
    fn test_starttls_and_logout() {
        assert_eq!(text(&Command::StartTls, "A0001"), "A0001 STARTTLS\r\n");
        assert_eq!(text(&Command::Logout, "A0009"), "A0009 LOGOUT\r\n");
    }

    #[test]
    fn test_redacted_hides_login() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        let shown = cmd.redacted("A0001");
        assert_eq!(shown, "A0001 LOGIN <redacted>");
        assert!(!shown.contains("secret"));
        assert_eq!(Command::Logout.redacted("A0002"), "A0002 LOGOUT");
    }
}
