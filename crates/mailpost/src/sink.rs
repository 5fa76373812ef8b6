//! Posts written to a directory.
//!
//! Each post becomes `<stem>.html`, holding the newsletter wrapped in a
//! block-editor HTML block, and `<stem>.json` with its metadata. When a
//! notification address is configured, `<stem>.notice.txt` records the
//! message that would be sent to it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use mailpost_core::{ContentSink, NewPost, PostId, PostNotice, PostStatus, SinkError};

/// Longest slug taken from a title.
const MAX_SLUG_LEN: usize = 60;

/// Wraps HTML in a block-editor custom HTML block.
pub fn wrap_html_block(html: &str) -> String {
    format!("<!-- wp:html -->\n{html}\n<!-- /wp:html -->")
}

/// Metadata stored next to each post.
#[derive(Debug, Serialize)]
struct PostRecord<'a> {
    title: &'a str,
    status: PostStatus,
    category: Option<u64>,
    login_required: bool,
    created_at: DateTime<Utc>,
}

/// A [`ContentSink`] that writes posts as files.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    notify_email: Option<String>,
    sequence: AtomicU32,
}

impl DirectorySink {
    /// Creates a sink writing into `dir`, created on first use.
    pub fn new(dir: impl Into<PathBuf>, notify_email: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            notify_email: notify_email.filter(|e| !e.trim().is_empty()),
            sequence: AtomicU32::new(0),
        }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_stem(&self, title: &str, now: DateTime<Utc>) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n:03}-{}", now.format("%Y%m%dT%H%M%S"), slugify(title))
    }
}

impl ContentSink for DirectorySink {
    async fn create_post(&self, post: &NewPost) -> Result<PostId, SinkError> {
        let now = Utc::now();
        let stem = self.next_stem(&post.title, now);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SinkError::new(format!("creating {}: {e}", self.dir.display())))?;

        let html_path = self.dir.join(format!("{stem}.html"));
        tokio::fs::write(&html_path, wrap_html_block(&post.html))
            .await
            .map_err(|e| SinkError::new(format!("writing {}: {e}", html_path.display())))?;

        let record = PostRecord {
            title: &post.title,
            status: post.status,
            category: post.category,
            login_required: post.login_required,
            created_at: now,
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| SinkError::new(format!("encoding metadata: {e}")))?;
        let meta_path = self.dir.join(format!("{stem}.json"));
        tokio::fs::write(&meta_path, json)
            .await
            .map_err(|e| SinkError::new(format!("writing {}: {e}", meta_path.display())))?;

        Ok(PostId(stem))
    }

    async fn notify(&self, notice: &PostNotice) {
        let Some(email) = &self.notify_email else {
            info!("{notice}");
            return;
        };

        info!("notifying {email} of post {}", notice.post_id);
        let message = format!(
            "To: {email}\nSubject: [Newsletter Poster] New newsletter post created: {}\n\n{notice}\n",
            notice.title
        );
        let path = self.dir.join(format!("{}.notice.txt", notice.post_id));
        if let Err(e) = tokio::fs::write(&path, message).await {
            warn!("failed to write notice {}: {e}", path.display());
        }
    }
}

/// Lowercase ASCII slug, words joined by `-`.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "newsletter".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            html: "<p>Hello</p>".to_string(),
            status: PostStatus::Publish,
            category: Some(7),
            login_required: true,
        }
    }

    #[test]
    fn test_wrap_html_block() {
        assert_eq!(
            wrap_html_block("<p>x</p>"),
            "<!-- wp:html -->\n<p>x</p>\n<!-- /wp:html -->"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Weekly Digest #12: Rust!"), "weekly-digest-12-rust");
        assert_eq!(slugify("  --Hello--  "), "hello");
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("???"), "newsletter");
        assert_eq!(slugify(&"a".repeat(100)).len(), MAX_SLUG_LEN);
    }

    #[tokio::test]
    async fn test_create_post_writes_html_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("posts"), None);

        let id = sink.create_post(&post("Weekly Digest")).await.unwrap();
        assert!(id.0.ends_with("-000-weekly-digest"));

        let html = tokio::fs::read_to_string(sink.dir().join(format!("{id}.html")))
            .await
            .unwrap();
        assert_eq!(html, "<!-- wp:html -->\n<p>Hello</p>\n<!-- /wp:html -->");

        let meta = tokio::fs::read_to_string(sink.dir().join(format!("{id}.json")))
            .await
            .unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["title"], "Weekly Digest");
        assert_eq!(meta["status"], "publish");
        assert_eq!(meta["category"], 7);
        assert_eq!(meta["login_required"], true);
        assert!(meta["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_same_title_gets_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), None);

        let first = sink.create_post(&post("Same")).await.unwrap();
        let second = sink.create_post(&post("Same")).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_create_post_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("posts");
        tokio::fs::write(&blocked, "not a directory").await.unwrap();

        let sink = DirectorySink::new(&blocked, None);
        let err = sink.create_post(&post("Blocked")).await.unwrap_err();
        assert!(err.to_string().contains("posts"));
    }

    #[tokio::test]
    async fn test_notify_writes_notice_when_address_configured() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), Some("admin@example.com".to_string()));
        let id = sink.create_post(&post("Weekly")).await.unwrap();

        sink.notify(&PostNotice {
            post_id: id.clone(),
            title: "Weekly".to_string(),
            status: PostStatus::Publish,
        })
        .await;

        let notice = tokio::fs::read_to_string(dir.path().join(format!("{id}.notice.txt")))
            .await
            .unwrap();
        assert!(notice.starts_with("To: admin@example.com\n"));
        assert!(notice.contains("Subject: [Newsletter Poster] New newsletter post created: Weekly\n"));
        assert!(notice.contains("Status: publish"));
    }

    #[tokio::test]
    async fn test_notify_without_address_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), Some("  ".to_string()));
        let id = sink.create_post(&post("Quiet")).await.unwrap();

        sink.notify(&PostNotice {
            post_id: id.clone(),
            title: "Quiet".to_string(),
            status: PostStatus::Draft,
        })
        .await;

        assert!(!dir.path().join(format!("{id}.notice.txt")).exists());
    }
}
