//! Read model served to the embedded comment widget.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::constants::PUBLISHERS_GROUP;
use crate::error::BridgeResult;
use crate::forum::{Category, Collaborators, PageWindow, Post, UserProfile};
use crate::settings::BridgeSettings;

/// A post plus the reply flags the widget needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedPost {
    #[serde(flatten)]
    pub post: Post,
    /// Replies to something other than the root post.
    pub is_reply: bool,
    pub parent_username: String,
    /// Replies to a post whose author can no longer be resolved.
    pub deleted_reply: bool,
}

impl DecoratedPost {
    #[must_use]
    pub fn new(post: Post, root_pid: Option<i64>) -> Self {
        let is_reply = post.to_pid.is_some_and(|to_pid| Some(to_pid) != root_pid);
        let parent_username = post
            .parent
            .as_ref()
            .and_then(|parent| parent.username.clone())
            .unwrap_or_default();
        let deleted_reply = post
            .parent
            .as_ref()
            .is_some_and(|parent| parent.username.is_none());

        Self {
            post,
            is_reply,
            parent_username,
            deleted_reply,
        }
    }
}

/// Drop soft-deleted posts and decorate the rest.
#[must_use]
pub fn decorate(posts: Vec<Post>, root_pid: Option<i64>) -> Vec<DecoratedPost> {
    posts
        .into_iter()
        .filter(|post| !post.deleted)
        .map(|post| DecoratedPost::new(post, root_pid))
        .collect()
}

/// JSON payload returned by the feed endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPayload {
    pub posts: Vec<DecoratedPost>,
    pub post_count: i64,
    pub user: UserProfile,
    pub template: Arc<str>,
    pub token: String,
    pub is_admin: bool,
    pub is_logged_in: bool,
    pub tid: Option<i64>,
    pub category: Option<Category>,
    pub main_post: Option<Post>,
    pub is_valid: bool,
    pub at_bottom: bool,
    pub at_top: bool,
    pub site_title: String,
}

/// Per-request inputs that do not come from storage.
#[derive(Debug, Clone)]
pub struct FeedContext {
    pub uid: i64,
    pub window: PageWindow,
    pub template: Arc<str>,
    pub token: String,
}

/// Fans out the feed reads and merges them into one payload.
pub struct FeedAssembler<'a> {
    collaborators: &'a Collaborators,
}

impl<'a> FeedAssembler<'a> {
    #[must_use]
    pub fn new(collaborators: &'a Collaborators) -> Self {
        Self { collaborators }
    }

    /// Assemble the feed for the thread bound to the article, if any.
    ///
    /// All reads run concurrently and must all succeed; the first failure
    /// fails the whole feed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::Upstream`] if any read fails.
    pub async fn assemble(
        &self,
        tid: Option<i64>,
        ctx: FeedContext,
        settings: &BridgeSettings,
    ) -> BridgeResult<FeedPayload> {
        let threads = &self.collaborators.threads;
        let users = &self.collaborators.users;
        let uid = ctx.uid;
        let window = ctx.window;

        let posts = async {
            match tid {
                Some(tid) => threads.topic_posts(tid, window, uid).await,
                None => Ok(Vec::new()),
            }
        };
        let post_count = async {
            match tid {
                Some(tid) => threads.post_count(tid).await,
                None => Ok(0),
            }
        };
        let category = async {
            match tid {
                Some(tid) => threads.category(tid).await,
                None => Ok(None),
            }
        };
        let main_post = async {
            match tid {
                Some(tid) => threads.main_post(tid, uid).await,
                None => Ok(None),
            }
        };

        let (posts, post_count, user, is_administrator, is_publisher, category, main_post) = tokio::try_join!(
            posts,
            post_count,
            users.profile(uid),
            users.is_administrator(uid),
            users.is_member(uid, PUBLISHERS_GROUP),
            category,
            main_post,
        )?;

        let root_pid = main_post.as_ref().map(|post| post.pid);
        let posts = decorate(posts, root_pid);
        let location = settings.compose_location;

        debug!(
            tid = ?tid,
            uid,
            posts = posts.len(),
            post_count,
            "Assembled comment feed"
        );

        Ok(FeedPayload {
            posts,
            post_count,
            user,
            template: ctx.template,
            token: ctx.token,
            is_admin: is_administrator || is_publisher,
            is_logged_in: uid > 0,
            tid,
            category,
            is_valid: main_post.is_some() && tid.is_some(),
            main_post,
            at_bottom: location.at_bottom(),
            at_top: location.at_top(),
            site_title: settings.title.clone(),
        })
    }
}
