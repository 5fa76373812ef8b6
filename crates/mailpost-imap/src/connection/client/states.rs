//! Type-state markers for IMAP client connection states.
//!
//! `Selected` also carries runtime state about the mailbox it selected.

use std::sync::Arc;

/// Marker type for the not-authenticated state.
///
/// In this state only STARTTLS and LOGIN are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state a mailbox can be selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// Mailbox status reported by SELECT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox (`* N EXISTS`).
    pub exists: u32,
}

impl MailboxStatus {
    /// Extracts the status from the untagged lines of a SELECT response.
    #[must_use]
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut status = Self::default();
        for line in lines {
            let mut words = line.split_whitespace();
            if words.next() != Some("*") {
                continue;
            }
            let (Some(count), Some(kind)) = (words.next(), words.next()) else {
                continue;
            };
            if kind.eq_ignore_ascii_case("EXISTS")
                && let Ok(n) = count.parse()
            {
                status.exists = n;
            }
        }
        status
    }
}

/// State for a selected mailbox.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Arc<str>,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            status,
        }
    }

    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the number of messages in the mailbox at selection time.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.status.exists
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

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_status_from_select_lines() {
        let lines = [
            "* FLAGS (\\Answered \\Seen)",
            "* 23 EXISTS",
            "* 0 RECENT",
            "* OK [UIDVALIDITY 3857529045] UIDs valid",
            "A0002 OK [READ-WRITE] SELECT completed",
        ];
        let status = MailboxStatus::from_lines(lines);
        assert_eq!(status.exists, 23);
    }

    #[test]
    fn test_status_without_exists() {
        let status = MailboxStatus::from_lines(["A0002 OK SELECT"]);
        assert_eq!(status.exists, 0);
    }

    #[test]
    fn test_selected_state_accessors() {
        let selected = Selected::new("INBOX", MailboxStatus { exists: 7 });
        assert_eq!(selected.mailbox(), "INBOX");
        assert_eq!(selected.exists(), 7);
    }
}
