//! Collaborator implementations backed by the SQLite database.

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::queries;
use super::Database;
use crate::binding::{ArticleKey, BindingStore};
use crate::constants::ADMINISTRATORS_GROUP;
use crate::forum::{
    BookmarkResult, Category, CreatedThread, NewReply, NewThread, PageWindow, Post,
    ReactionStore, Session, ThreadStore, UserDirectory, UserProfile, VoteResult,
};
use crate::settings::{BridgeSettings, SettingsStore};

/// Minimum title length after trimming.
const MIN_TITLE_LENGTH: usize = 3;

impl Database {
    /// Reaction target: a visible post in a live topic. Returns the author uid.
    async fn reaction_target(&self, pid: i64, uid: i64) -> Result<i64> {
        if uid <= 0 {
            bail!("[[error:not-logged-in]]");
        }
        match queries::get_post(self.pool(), pid, uid).await? {
            Some(post) if !post.deleted => Ok(post.uid),
            _ => bail!("[[error:no-post]]"),
        }
    }

    async fn vote_result(&self, pid: i64, upvoted: bool) -> Result<VoteResult> {
        Ok(VoteResult {
            pid,
            votes: queries::count_votes(self.pool(), pid).await?,
            upvoted,
        })
    }

    async fn bookmark_result(&self, pid: i64, bookmarked: bool) -> Result<BookmarkResult> {
        Ok(BookmarkResult {
            pid,
            bookmarks: queries::count_bookmarks(self.pool(), pid).await?,
            bookmarked,
        })
    }
}

#[async_trait]
impl ThreadStore for Database {
    async fn create_thread(&self, thread: &NewThread) -> Result<CreatedThread> {
        if thread.uid <= 0 {
            bail!("[[error:not-logged-in]]");
        }
        if thread.title.trim().chars().count() < MIN_TITLE_LENGTH {
            bail!("[[error:title-too-short]]");
        }
        if thread.content.trim().is_empty() {
            bail!("[[error:content-too-short]]");
        }
        if !queries::category_exists(self.pool(), thread.cid).await? {
            bail!("[[error:no-category]]");
        }
        queries::insert_thread(self.pool(), thread).await
    }

    async fn reply(&self, reply: &NewReply) -> Result<i64> {
        if reply.uid <= 0 {
            bail!("[[error:not-logged-in]]");
        }
        if reply.content.trim().is_empty() {
            bail!("[[error:content-too-short]]");
        }
        match queries::get_topic(self.pool(), reply.tid).await? {
            Some(topic) if !topic.deleted => {}
            _ => bail!("[[error:no-topic]]"),
        }
        queries::insert_reply(self.pool(), reply).await
    }

    async fn topic_posts(&self, tid: i64, window: PageWindow, viewer: i64) -> Result<Vec<Post>> {
        let rows = queries::get_topic_posts(self.pool(), tid, window, viewer).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn post_count(&self, tid: i64) -> Result<i64> {
        queries::count_topic_posts(self.pool(), tid).await
    }

    async fn main_post(&self, tid: i64, viewer: i64) -> Result<Option<Post>> {
        Ok(queries::get_main_post(self.pool(), tid, viewer)
            .await?
            .map(Post::from))
    }

    async fn category(&self, tid: i64) -> Result<Option<Category>> {
        queries::get_topic_category(self.pool(), tid).await
    }

    async fn set_post_field(&self, pid: i64, field: &str, value: &str) -> Result<()> {
        queries::set_post_field(self.pool(), pid, field, value).await
    }

    async fn post_field(&self, pid: i64, field: &str) -> Result<Option<String>> {
        queries::get_post_field(self.pool(), pid, field).await
    }
}

#[async_trait]
impl ReactionStore for Database {
    async fn upvote(&self, pid: i64, uid: i64) -> Result<VoteResult> {
        let author = self.reaction_target(pid, uid).await?;
        if author == uid {
            bail!("[[error:self-vote]]");
        }
        queries::add_vote(self.pool(), pid, uid).await?;
        self.vote_result(pid, true).await
    }

    async fn unvote(&self, pid: i64, uid: i64) -> Result<VoteResult> {
        self.reaction_target(pid, uid).await?;
        queries::remove_vote(self.pool(), pid, uid).await?;
        self.vote_result(pid, false).await
    }

    async fn bookmark(&self, pid: i64, uid: i64) -> Result<BookmarkResult> {
        self.reaction_target(pid, uid).await?;
        queries::add_bookmark(self.pool(), pid, uid).await?;
        self.bookmark_result(pid, true).await
    }

    async fn unbookmark(&self, pid: i64, uid: i64) -> Result<BookmarkResult> {
        self.reaction_target(pid, uid).await?;
        queries::remove_bookmark(self.pool(), pid, uid).await?;
        self.bookmark_result(pid, false).await
    }
}

#[async_trait]
impl UserDirectory for Database {
    async fn profile(&self, uid: i64) -> Result<UserProfile> {
        if uid <= 0 {
            return Ok(UserProfile::guest());
        }
        Ok(queries::get_user_by_id(self.pool(), uid)
            .await?
            .map_or_else(UserProfile::guest, UserProfile::from))
    }

    async fn is_administrator(&self, uid: i64) -> Result<bool> {
        self.is_member(uid, ADMINISTRATORS_GROUP).await
    }

    async fn is_member(&self, uid: i64, group: &str) -> Result<bool> {
        if uid <= 0 {
            return Ok(false);
        }
        queries::is_group_member(self.pool(), group, uid).await
    }

    async fn session(&self, token: &str) -> Result<Option<Session>> {
        queries::get_session_by_token(self.pool(), token).await
    }
}

#[async_trait]
impl BindingStore for Database {
    async fn get(&self, key: &ArticleKey) -> Result<Option<i64>> {
        queries::get_binding(self.pool(), &key.namespace, &key.article_id).await
    }

    async fn create(&self, key: &ArticleKey, tid: i64) -> Result<()> {
        queries::upsert_binding(self.pool(), &key.namespace, &key.article_id, tid).await
    }
}

#[async_trait]
impl SettingsStore for Database {
    async fn load(&self) -> Result<BridgeSettings> {
        let pairs = queries::get_all_settings(self.pool()).await?;
        Ok(BridgeSettings::from_pairs(pairs))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        queries::set_setting(self.pool(), key, value).await
    }
}
