//! Mailbox scanning: from an IMAP folder to extracted newsletter items.
//!
//! One scan opens a fresh connection, logs in, selects the folder, picks
//! candidate messages, fetches and decodes them, and always logs out before
//! returning. Freshness is decided by `Message-ID` against the ledger, not
//! by the `\Seen` flag, since newsletters may already have been read in
//! another client.

use std::collections::BTreeSet;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use mailpost_imap::{
    Client, Config, ImapStream, NotAuthenticated, SearchCriteria, Section, Selected, Transcript,
};
use mailpost_mime::{Headers, decode_mime_header, extract_html};

use crate::Result;
use crate::ledger::ProcessedIds;
use crate::settings::Settings;

/// Subject used when a message has none.
pub const DEFAULT_SUBJECT: &str = "Newsletter";

/// A newsletter pulled from the mailbox, ready for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterItem {
    /// `Message-ID` header, empty when the message has none.
    pub message_id: String,
    /// Decoded subject.
    pub subject: String,
    /// Decoded HTML body.
    pub html: String,
    /// `Date` header as sent.
    pub raw_date: String,
    /// Sequence number, only meaningful within the scan's session.
    pub sequence_number: u32,
}

/// Opens IMAP connections.
///
/// The scanner asks for a fresh connection on every scan.
pub trait Connector {
    /// Stream type of the connections produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connects and reads the greeting.
    fn connect(
        &self,
        config: &Config,
    ) -> impl Future<Output = mailpost_imap::Result<Client<Self::Stream, NotAuthenticated>>> + Send;
}

/// Connects over TCP according to the configured security mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = ImapStream;

    async fn connect(
        &self,
        config: &Config,
    ) -> mailpost_imap::Result<Client<ImapStream, NotAuthenticated>> {
        mailpost_imap::connect(config).await
    }
}

/// Scans a mailbox for newsletters.
#[derive(Debug)]
pub struct MailboxScanner<C> {
    connector: C,
    transcript_capacity: Option<usize>,
    last_transcript: Option<Transcript>,
}

impl<C: Connector> MailboxScanner<C> {
    /// Creates a scanner using `connector` for each scan.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            transcript_capacity: None,
            last_transcript: None,
        }
    }

    /// Records up to `capacity` protocol lines of every scan.
    #[must_use]
    pub fn with_transcript(mut self, capacity: usize) -> Self {
        self.transcript_capacity = Some(capacity);
        self
    }

    /// Transcript of the most recent scan that reached the selected state.
    #[must_use]
    pub const fn last_transcript(&self) -> Option<&Transcript> {
        self.last_transcript.as_ref()
    }

    /// Runs one scan.
    ///
    /// Messages whose `Message-ID` is in `processed` are skipped. Every
    /// message that was fetched is flagged `\Seen`, whether or not it
    /// produced an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are incomplete, or connecting,
    /// logging in or selecting the folder fails. Failures on individual
    /// messages are logged and skipped.
    pub async fn scan(
        &mut self,
        settings: &Settings,
        processed: &ProcessedIds,
    ) -> Result<Vec<NewsletterItem>> {
        settings.validate()?;
        self.last_transcript = None;

        let mut client = self.connector.connect(&settings.imap_config()).await?;
        if let Some(capacity) = self.transcript_capacity {
            client.enable_transcript(capacity);
        }

        let client = client
            .login(settings.username.trim(), &settings.password)
            .await?;
        let (mut selected, status) = client.select(&settings.folder).await?;
        debug!("{} holds {} message(s)", settings.folder, status.exists);

        let items = collect_items(&mut selected, settings, processed).await;

        self.last_transcript = selected.take_transcript();
        if let Err(e) = selected.logout().await {
            debug!("LOGOUT failed: {e}");
        }

        info!("scan of {} found {} newsletter(s)", settings.folder, items.len());
        Ok(items)
    }
}

async fn collect_items<S>(
    client: &mut Client<S, Selected>,
    settings: &Settings,
    processed: &ProcessedIds,
) -> Vec<NewsletterItem>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let candidates = find_candidates(client, settings).await;
    if candidates.is_empty() {
        debug!("no candidate messages");
        return Vec::new();
    }
    debug!("{} candidate message(s)", candidates.len());

    let mut items = Vec::new();
    for seq in candidates {
        match fetch_item(client, seq, processed).await {
            Fetched::Item(item) => items.push(*item),
            Fetched::AlreadyProcessed | Fetched::NoHeader => continue,
            Fetched::NoHtml => {}
        }
        if let Err(e) = client.store_seen(seq).await {
            warn!("could not flag message {seq} as seen: {e}");
        }
    }
    items
}

/// Candidate sequence numbers, ascending and without duplicates.
async fn find_candidates<S>(client: &mut Client<S, Selected>, settings: &Settings) -> Vec<u32>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !settings.uses_sender_filter() {
        return match client.search(&SearchCriteria::All).await {
            Ok(found) => found.into_iter().collect::<BTreeSet<_>>().into_iter().collect(),
            Err(e) => {
                warn!("SEARCH ALL failed, treating mailbox as empty: {e}");
                Vec::new()
            }
        };
    }

    let mut found = BTreeSet::new();
    for sender in settings.senders() {
        match client.search(&SearchCriteria::From(sender.to_string())).await {
            Ok(matches) => {
                debug!("{} message(s) from {sender}", matches.len());
                found.extend(matches);
            }
            Err(e) => warn!("SEARCH FROM {sender} failed, skipping sender: {e}"),
        }
    }
    found.into_iter().collect()
}

enum Fetched {
    Item(Box<NewsletterItem>),
    AlreadyProcessed,
    NoHeader,
    NoHtml,
}

async fn fetch_item<S>(
    client: &mut Client<S, Selected>,
    seq: u32,
    processed: &ProcessedIds,
) -> Fetched
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let header = match client.fetch_section(seq, &Section::Header).await {
        Ok(header) if !header.is_empty() => header,
        Ok(_) => {
            warn!("message {seq}: empty header fetch, skipping");
            return Fetched::NoHeader;
        }
        Err(e) => {
            warn!("message {seq}: header fetch failed, skipping: {e}");
            return Fetched::NoHeader;
        }
    };

    let headers = Headers::parse(&String::from_utf8_lossy(&header));
    let message_id = headers.get("message-id").unwrap_or_default().to_string();
    if !message_id.is_empty() && processed.contains(&message_id) {
        debug!("message {seq}: {message_id} already processed");
        return Fetched::AlreadyProcessed;
    }

    let subject = decode_mime_header(headers.get("subject").unwrap_or(DEFAULT_SUBJECT));
    let raw_date = headers.get("date").unwrap_or_default().to_string();

    let html = match client.fetch_section(seq, &Section::Full).await {
        Ok(body) if !body.is_empty() => extract_html(&body),
        Ok(_) => {
            warn!("message {seq}: empty body fetch");
            String::new()
        }
        Err(e) => {
            warn!("message {seq}: body fetch failed: {e}");
            String::new()
        }
    };

    if html.is_empty() {
        warn!("message {seq} ({subject}): no HTML part, skipping");
        return Fetched::NoHtml;
    }

    Fetched::Item(Box::new(NewsletterItem {
        message_id,
        subject,
        html,
        raw_date,
        sequence_number: seq,
    }))
}
