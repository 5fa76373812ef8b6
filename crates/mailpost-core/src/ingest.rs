//! The ingestion cycle.

use std::fmt;

use tracing::{info, warn};

use mailpost_imap::Transcript;

use crate::Result;
use crate::content::{clean_html, clean_subject, extract_forwarded_content};
use crate::ledger::{LEDGER_CAPACITY, LedgerStore, ProcessedIds};
use crate::scanner::{Connector, MailboxScanner, NewsletterItem};
use crate::settings::Settings;
use crate::sink::{ContentSink, NewPost, PostNotice};

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Newsletters found in the mailbox.
    pub found: usize,
    /// Posts created.
    pub created: usize,
    /// Newsletters the sink rejected.
    pub failed: usize,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found == 0 {
            f.write_str("No new newsletter emails found.")
        } else {
            write!(f, "Processed {} newsletter email(s).", self.created)
        }
    }
}

/// Drives scans into posts and keeps the ledger current.
///
/// # Concurrency
///
/// A cycle takes `&mut self`, so one `Ingestor` never overlaps with itself.
/// Two ingestors sharing a ledger store must not run cycles at the same
/// time: each reads the ledger once at the start and writes it once at the
/// end, and the later write wins.
#[derive(Debug)]
pub struct Ingestor<C, L, K> {
    settings: Settings,
    scanner: MailboxScanner<C>,
    ledger: L,
    sink: K,
}

impl<C, L, K> Ingestor<C, L, K>
where
    C: Connector,
    L: LedgerStore,
    K: ContentSink,
{
    /// Creates an ingestor.
    pub const fn new(settings: Settings, connector: C, ledger: L, sink: K) -> Self {
        Self {
            settings,
            scanner: MailboxScanner::new(connector),
            ledger,
            sink,
        }
    }

    /// Keeps a protocol transcript of up to `capacity` lines per cycle.
    #[must_use]
    pub fn with_transcript(mut self, capacity: usize) -> Self {
        self.scanner = self.scanner.with_transcript(capacity);
        self
    }

    /// The settings in use.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The content sink.
    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Transcript of the last cycle's IMAP session, if recording.
    #[must_use]
    pub const fn last_transcript(&self) -> Option<&Transcript> {
        self.scanner.last_transcript()
    }

    /// Runs one ingestion cycle.
    ///
    /// Each newsletter is unwrapped, cleaned and handed to the sink. A sink
    /// failure skips that newsletter only. The ledger gains the Message-ID
    /// of every created post, is trimmed to the newest
    /// [`LEDGER_CAPACITY`] entries and saved.
    ///
    /// # Errors
    ///
    /// Scan errors are returned unchanged. Ledger load and save failures
    /// are returned as well.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        self.settings.validate()?;
        let mut processed: ProcessedIds = self.ledger.load().await?.into_iter().collect();

        let items = self.scanner.scan(&self.settings, &processed).await?;
        let mut summary = CycleSummary {
            found: items.len(),
            ..CycleSummary::default()
        };
        if items.is_empty() {
            info!("{summary}");
            return Ok(summary);
        }

        for item in items {
            if self.publish(&item).await {
                processed.insert(item.message_id);
                summary.created += 1;
            } else {
                summary.failed += 1;
            }
        }

        processed.truncate_oldest(LEDGER_CAPACITY);
        self.ledger.save(processed.as_slice()).await?;

        info!("{summary}");
        Ok(summary)
    }

    /// Creates and announces one post. Returns false if the sink refused it.
    async fn publish(&self, item: &NewsletterItem) -> bool {
        let post = NewPost {
            title: clean_subject(&item.subject),
            html: clean_html(&extract_forwarded_content(&item.html)),
            status: self.settings.post_status,
            category: self.settings.category,
            login_required: true,
        };

        match self.sink.create_post(&post).await {
            Ok(post_id) => {
                info!("created post {post_id}: {}", post.title);
                let notice = PostNotice {
                    post_id,
                    title: post.title,
                    status: post.status,
                };
                self.sink.notify(&notice).await;
                true
            }
            Err(e) => {
                warn!("failed to create post for \"{}\": {e}", item.subject);
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_messages() {
        assert_eq!(
            CycleSummary::default().to_string(),
            "No new newsletter emails found."
        );
        let summary = CycleSummary {
            found: 3,
            created: 2,
            failed: 1,
        };
        assert_eq!(summary.to_string(), "Processed 2 newsletter email(s).");
    }
}
