//! Scripted IMAP sessions and a recording sink shared by the integration
//! tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailpost_core::{
    ContentSink, Connector, NewPost, PostId, PostNotice, Settings, SinkError,
};
use mailpost_imap::{Client, Config, NotAuthenticated};

/// Stream replaying a fixed server script and capturing what the client sends.
pub struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();
        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }
        let remaining = &data[pos..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        self.responses.set_position((pos + n) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Builds a server script, tracking the tags the client will use.
pub struct Script {
    bytes: Vec<u8>,
    command_tag: u32,
    fetch_tag: u32,
}

impl Script {
    /// Starts with an `* OK` greeting.
    pub fn new() -> Self {
        Self {
            bytes: b"* OK IMAP4rev1 ready\r\n".to_vec(),
            command_tag: 0,
            fetch_tag: 1000,
        }
    }

    /// Starts with an arbitrary greeting line.
    pub fn with_greeting(greeting: &str) -> Self {
        let mut script = Self {
            bytes: Vec::new(),
            command_tag: 0,
            fetch_tag: 1000,
        };
        script.line(greeting);
        script
    }

    fn next_command_tag(&mut self) -> String {
        self.command_tag += 1;
        format!("A{:04}", self.command_tag)
    }

    fn line(&mut self, line: &str) {
        self.bytes.extend_from_slice(line.as_bytes());
        self.bytes.extend_from_slice(b"\r\n");
    }

    /// Answers the next command with untagged `lines` and a tagged OK.
    pub fn ok(mut self, lines: &[&str]) -> Self {
        for line in lines {
            self.line(line);
        }
        let tag = self.next_command_tag();
        self.line(&format!("{tag} OK completed"));
        self
    }

    /// Answers the next command with a tagged NO.
    pub fn no(mut self, text: &str) -> Self {
        let tag = self.next_command_tag();
        self.line(&format!("{tag} NO {text}"));
        self
    }

    /// LOGIN then SELECT, reporting `exists` messages.
    pub fn logged_in(self, exists: u32) -> Self {
        self.ok(&[]).ok(&[&format!("* {exists} EXISTS"), "* 0 RECENT"])
    }

    /// Answers the next section fetch with `payload` as a literal.
    pub fn fetch(mut self, seq: u32, payload: &[u8]) -> Self {
        self.fetch_tag += 1;
        self.bytes
            .extend_from_slice(format!("* {seq} FETCH (BODY[] {{{}}}\r\n", payload.len()).as_bytes());
        self.bytes.extend_from_slice(payload);
        self.line(")");
        self.line(&format!("F{} OK FETCH completed", self.fetch_tag));
        self
    }

    /// Answers the next section fetch without a literal.
    pub fn fetch_nothing(mut self, seq: u32) -> Self {
        self.fetch_tag += 1;
        self.line(&format!("* {seq} FETCH (FLAGS ())"));
        self.line(&format!("F{} OK FETCH completed", self.fetch_tag));
        self
    }

    /// Answers the STORE for `seq`.
    pub fn stored(self, seq: u32) -> Self {
        self.ok(&[&format!("* {seq} FETCH (FLAGS (\\Seen))")])
    }

    /// Answers LOGOUT.
    pub fn logout(self) -> Self {
        self.ok(&["* BYE logging out"])
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Hands out one scripted session per connect.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    sessions: Arc<Mutex<VecDeque<(Vec<u8>, Arc<Mutex<Vec<u8>>>)>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a session; returns the handle that captures its client output.
    pub fn push(&self, script: Script) -> Arc<Mutex<Vec<u8>>> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.sessions
            .lock()
            .unwrap()
            .push_back((script.into_bytes(), Arc::clone(&sent)));
        sent
    }

    pub fn remaining(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Connector for ScriptedConnector {
    type Stream = MockStream;

    async fn connect(
        &self,
        _config: &Config,
    ) -> mailpost_imap::Result<Client<MockStream, NotAuthenticated>> {
        let session = self.sessions.lock().unwrap().pop_front();
        let Some((responses, sent)) = session else {
            return Err(mailpost_imap::Error::ConnectionFailed(
                "no scripted session left".to_string(),
            ));
        };
        Client::from_stream(MockStream {
            responses: Cursor::new(responses),
            sent,
        })
        .await
    }
}

pub fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

/// Sink that keeps every post and notice, refusing titles it is told to.
#[derive(Default)]
pub struct RecordingSink {
    pub posts: Mutex<Vec<NewPost>>,
    pub notices: Mutex<Vec<PostNotice>>,
    pub refuse_titles: Vec<String>,
}

impl RecordingSink {
    pub fn refusing(title: &str) -> Self {
        Self {
            refuse_titles: vec![title.to_string()],
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<NewPost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<PostNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl ContentSink for RecordingSink {
    async fn create_post(&self, post: &NewPost) -> Result<PostId, SinkError> {
        if self.refuse_titles.contains(&post.title) {
            return Err(SinkError::new("refused"));
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(post.clone());
        Ok(PostId::from(posts.len() as u64))
    }

    async fn notify(&self, notice: &PostNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

pub fn settings() -> Settings {
    Settings {
        host: "imap.example.com".to_string(),
        username: "newsletters@example.org".to_string(),
        password: "pa\"ss".to_string(),
        ..Settings::default()
    }
}

/// Header block for a newsletter.
pub fn header(message_id: Option<&str>, subject: &str) -> Vec<u8> {
    let mut text = String::from("From: Weekly <news@list.example>\r\n");
    if let Some(id) = message_id {
        text.push_str(&format!("Message-ID: {id}\r\n"));
    }
    text.push_str(&format!("Subject: {subject}\r\nDate: Tue, 17 Feb 2026 09:00:00 +0000\r\n\r\n"));
    text.into_bytes()
}

/// Full multipart/alternative message with `html` as its HTML part.
pub fn message(header: &[u8], html: &str) -> Vec<u8> {
    let head = String::from_utf8_lossy(header);
    let head = head.trim_end();
    format!(
        "{head}\r\nContent-Type: multipart/alternative; boundary=\"sep\"\r\n\r\n\
--sep\r\nContent-Type: text/plain\r\n\r\nplain\r\n\
--sep\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{html}\r\n\
--sep--\r\n"
    )
    .into_bytes()
}

/// Full plain-text message.
pub fn plain_message(header: &[u8]) -> Vec<u8> {
    let head = String::from_utf8_lossy(header);
    format!(
        "{}\r\nContent-Type: text/plain\r\n\r\nNo HTML here\r\n",
        head.trim_end()
    )
    .into_bytes()
}
