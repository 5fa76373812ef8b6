//! The content sink: where finished newsletters become posts.

use std::fmt;
use std::future::Future;

use crate::settings::PostStatus;

/// A post ready to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Post title, already stripped of forwarding prefixes.
    pub title: String,
    /// Rewritten newsletter HTML.
    pub html: String,
    /// Desired status.
    pub status: PostStatus,
    /// Desired category, if any.
    pub category: Option<u64>,
    /// Whether the post should only be visible to logged-in readers.
    pub login_required: bool,
}

/// Identifier the sink assigned to a created post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Sent to the sink after a post was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostNotice {
    /// The created post.
    pub post_id: PostId,
    /// Its title.
    pub title: String,
    /// Its status.
    pub status: PostStatus,
}

impl fmt::Display for PostNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "A new newsletter post has been created.")?;
        writeln!(f)?;
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Status: {}", self.status)?;
        write!(f, "Post: {}", self.post_id)
    }
}

/// A failure to create one post. Never aborts a cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Creates an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Destination for ingested newsletters.
pub trait ContentSink {
    /// Creates a post and returns its identifier.
    fn create_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<PostId, SinkError>> + Send;

    /// Called once for every post that was created.
    ///
    /// The default does nothing. Implementations decide whether and whom to
    /// notify; a notification failure is theirs to log.
    fn notify(&self, notice: &PostNotice) -> impl Future<Output = ()> + Send {
        let _ = notice;
        async {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let notice = PostNotice {
            post_id: PostId::from(42),
            title: "Weekly".to_string(),
            status: PostStatus::Draft,
        };
        assert_eq!(
            notice.to_string(),
            "A new newsletter post has been created.\n\nTitle: Weekly\nStatus: draft\nPost: 42"
        );
    }

    #[test]
    fn test_sink_error_display() {
        assert_eq!(SinkError::new("disk full").to_string(), "disk full");
    }
}
