//! Forum collaborators consumed by the bridge.
//!
//! The bridge never owns threads, users or votes. It talks to the forum
//! through these traits; [`crate::db::Database`] implements all of them on
//! SQLite.

mod models;

pub use models::*;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::binding::BindingStore;
use crate::db::Database;
use crate::settings::SettingsStore;

/// Thread and post storage.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Create a topic together with its root post.
    async fn create_thread(&self, thread: &NewThread) -> Result<CreatedThread>;

    /// Append a reply, returning the new post id.
    async fn reply(&self, reply: &NewReply) -> Result<i64>;

    /// One page of replies (root post excluded), oldest first.
    async fn topic_posts(&self, tid: i64, window: PageWindow, viewer: i64) -> Result<Vec<Post>>;

    async fn post_count(&self, tid: i64) -> Result<i64>;

    /// Root post of a live topic.
    async fn main_post(&self, tid: i64, viewer: i64) -> Result<Option<Post>>;

    async fn category(&self, tid: i64) -> Result<Option<Category>>;

    async fn set_post_field(&self, pid: i64, field: &str, value: &str) -> Result<()>;

    async fn post_field(&self, pid: i64, field: &str) -> Result<Option<String>>;
}

/// Vote and bookmark primitives.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn upvote(&self, pid: i64, uid: i64) -> Result<VoteResult>;

    async fn unvote(&self, pid: i64, uid: i64) -> Result<VoteResult>;

    async fn bookmark(&self, pid: i64, uid: i64) -> Result<BookmarkResult>;

    async fn unbookmark(&self, pid: i64, uid: i64) -> Result<BookmarkResult>;
}

/// Users, sessions and group membership.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Profile for `uid`; uid 0 yields the guest profile.
    async fn profile(&self, uid: i64) -> Result<UserProfile>;

    async fn is_administrator(&self, uid: i64) -> Result<bool>;

    async fn is_member(&self, uid: i64, group: &str) -> Result<bool>;

    async fn session(&self, token: &str) -> Result<Option<Session>>;
}

/// Every collaborator the bridge needs, shared across requests.
#[derive(Clone)]
pub struct Collaborators {
    pub threads: Arc<dyn ThreadStore>,
    pub reactions: Arc<dyn ReactionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub bindings: Arc<dyn BindingStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Collaborators {
    /// Back every collaborator with the same SQLite database.
    #[must_use]
    pub fn sqlite(db: Database) -> Self {
        let db = Arc::new(db);
        Self {
            threads: db.clone(),
            reactions: db.clone(),
            users: db.clone(),
            bindings: db.clone(),
            settings: db,
        }
    }
}
