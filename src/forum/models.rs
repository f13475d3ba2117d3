use serde::{Deserialize, Serialize};

use crate::constants::FEED_PAGE_SIZE;

/// Forum category a topic lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub cid: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Author summary attached to each post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub uid: i64,
    pub username: String,
    pub picture: Option<String>,
}

/// The post a reply points at. `username` is `None` once that post is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub username: Option<String>,
}

/// A post as the forum returns it to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub pid: i64,
    pub tid: i64,
    pub uid: i64,
    pub content: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_pid: Option<i64>,
    pub deleted: bool,
    pub votes: i64,
    pub upvoted: bool,
    pub bookmarked: bool,
    pub user: PostAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

/// Public profile of the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: i64,
    pub username: String,
    pub picture: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn guest() -> Self {
        Self {
            uid: 0,
            username: "[[global:guest]]".to_string(),
            picture: None,
        }
    }
}

/// An authenticated browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub uid: i64,
    pub csrf_token: String,
    /// RFC 3339 timestamp.
    pub expires_at: String,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map_or(true, |expires| expires <= now)
    }
}

/// Input for creating a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub uid: i64,
    pub cid: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Article the topic was published from.
    pub external_link: Option<String>,
    pub external_comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedThread {
    pub tid: i64,
    /// Root post id.
    pub pid: i64,
}

/// Input for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub tid: i64,
    pub uid: i64,
    pub to_pid: Option<i64>,
    pub content: String,
}

/// Inclusive index range of replies to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: i64,
    pub stop: i64,
}

impl PageWindow {
    /// Window for a zero-based feed page.
    #[must_use]
    pub fn for_page(page: u32) -> Self {
        let start = i64::from(page) * FEED_PAGE_SIZE;
        Self {
            start,
            stop: start + FEED_PAGE_SIZE - 1,
        }
    }

    #[must_use]
    pub fn len(&self) -> i64 {
        (self.stop - self.start + 1).max(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResult {
    pub pid: i64,
    pub votes: i64,
    pub upvoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkResult {
    pub pid: i64,
    pub bookmarks: i64,
    pub bookmarked: bool,
}
