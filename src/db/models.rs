use serde::{Deserialize, Serialize};

use crate::forum::{ParentRef, Post, PostAuthor, UserProfile};

/// A registered forum user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub uid: i64,
    pub username: String,
    pub picture: Option<String>,
    pub created_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            username: user.username,
            picture: user.picture,
        }
    }
}

/// A forum topic.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub tid: i64,
    pub cid: i64,
    pub uid: i64,
    pub title: String,
    pub main_pid: Option<i64>,
    /// JSON array of tag names.
    pub tags: String,
    pub external_link: Option<String>,
    pub external_comment: Option<String>,
    pub deleted: bool,
    pub created_at: String,
}

/// A post joined with its author, its parent's author and the viewer's
/// reactions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub pid: i64,
    pub tid: i64,
    pub uid: i64,
    pub content: String,
    pub to_pid: Option<i64>,
    pub deleted: bool,
    pub timestamp: i64,
    pub username: Option<String>,
    pub picture: Option<String>,
    pub parent_username: Option<String>,
    pub votes: i64,
    pub upvoted: bool,
    pub bookmarked: bool,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            pid: row.pid,
            tid: row.tid,
            uid: row.uid,
            content: row.content,
            timestamp: row.timestamp,
            to_pid: row.to_pid,
            deleted: row.deleted,
            votes: row.votes,
            upvoted: row.upvoted,
            bookmarked: row.bookmarked,
            user: PostAuthor {
                uid: row.uid,
                username: row
                    .username
                    .unwrap_or_else(|| "[[global:former_user]]".to_string()),
                picture: row.picture,
            },
            parent: row.to_pid.map(|_| ParentRef {
                username: row.parent_username,
            }),
        }
    }
}
