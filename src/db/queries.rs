use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;

use super::models::{PostRow, Topic, User};
use crate::auth::{generate_csrf_token, generate_session_token};
use crate::forum::{Category, CreatedThread, NewReply, NewThread, PageWindow, Session};

/// Shared projection for posts. Binds: viewer uid (votes), viewer uid
/// (bookmarks), then whatever the appended WHERE clause needs.
const POST_SELECT: &str = r"
    SELECT
        p.pid,
        p.tid,
        p.uid,
        p.content,
        p.to_pid,
        p.deleted,
        p.timestamp,
        u.username,
        u.picture,
        pu.username AS parent_username,
        (SELECT COUNT(*) FROM post_votes v WHERE v.pid = p.pid) AS votes,
        EXISTS(SELECT 1 FROM post_votes v WHERE v.pid = p.pid AND v.uid = ?) AS upvoted,
        EXISTS(SELECT 1 FROM post_bookmarks b WHERE b.pid = p.pid AND b.uid = ?) AS bookmarked
    FROM posts p
    JOIN topics t ON t.tid = p.tid AND t.deleted = 0
    LEFT JOIN users u ON u.uid = p.uid
    LEFT JOIN posts parent ON parent.pid = p.to_pid AND parent.deleted = 0
    LEFT JOIN users pu ON pu.uid = parent.uid
";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ========== Users ==========

/// Create a user, returning the new uid.
pub async fn create_user(pool: &SqlitePool, username: &str, picture: Option<&str>) -> Result<i64> {
    let result = sqlx::query("INSERT INTO users (username, picture) VALUES (?, ?)")
        .bind(username)
        .bind(picture)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

pub async fn get_user_by_id(pool: &SqlitePool, uid: i64) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user by id")
}

pub async fn add_group_member(pool: &SqlitePool, group: &str, uid: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO group_members (group_name, uid) VALUES (?, ?)")
        .bind(group)
        .bind(uid)
        .execute(pool)
        .await
        .context("Failed to add group member")?;
    Ok(())
}

pub async fn is_group_member(pool: &SqlitePool, group: &str, uid: i64) -> Result<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_name = ? AND uid = ?)",
    )
    .bind(group)
    .bind(uid)
    .fetch_one(pool)
    .await
    .context("Failed to check group membership")
}

// ========== Sessions ==========

/// Create a session for `uid` that expires after `ttl`.
pub async fn create_session(pool: &SqlitePool, uid: i64, ttl: chrono::Duration) -> Result<Session> {
    let session = Session {
        token: generate_session_token(),
        uid,
        csrf_token: generate_csrf_token(),
        expires_at: (chrono::Utc::now() + ttl).to_rfc3339(),
    };

    sqlx::query("INSERT INTO sessions (token, uid, csrf_token, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session.token)
        .bind(session.uid)
        .bind(&session.csrf_token)
        .bind(&session.expires_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session)
}

pub async fn get_session_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    sqlx::query_as("SELECT token, uid, csrf_token, expires_at FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch session by token")
}

// ========== Categories ==========

pub async fn create_category(pool: &SqlitePool, name: &str) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let cid = sqlx::query("INSERT INTO categories (name, slug) VALUES (?, '')")
        .bind(name)
        .execute(&mut *tx)
        .await
        .context("Failed to create category")?
        .last_insert_rowid();

    let slug = format!("{cid}/{}", slugify(name));
    sqlx::query("UPDATE categories SET slug = ? WHERE cid = ?")
        .bind(&slug)
        .bind(cid)
        .execute(&mut *tx)
        .await
        .context("Failed to set category slug")?;

    tx.commit().await.context("Failed to commit category")?;
    Ok(cid)
}

pub async fn category_exists(pool: &SqlitePool, cid: i64) -> Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE cid = ?)")
        .bind(cid)
        .fetch_one(pool)
        .await
        .context("Failed to check category")
}

/// Category of a live topic.
pub async fn get_topic_category(pool: &SqlitePool, tid: i64) -> Result<Option<Category>> {
    sqlx::query_as(
        r"
        SELECT c.cid, c.name, c.slug, c.description
        FROM categories c
        JOIN topics t ON t.cid = c.cid
        WHERE t.tid = ? AND t.deleted = 0
        ",
    )
    .bind(tid)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch topic category")
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

// ========== Topics ==========

/// Insert a topic and its root post in one transaction.
pub async fn insert_thread(pool: &SqlitePool, thread: &NewThread) -> Result<CreatedThread> {
    let tags = serde_json::to_string(&thread.tags).context("Failed to encode tags")?;
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let tid = sqlx::query(
        r"
        INSERT INTO topics (cid, uid, title, tags, external_link, external_comment)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(thread.cid)
    .bind(thread.uid)
    .bind(thread.title.trim())
    .bind(&tags)
    .bind(&thread.external_link)
    .bind(&thread.external_comment)
    .execute(&mut *tx)
    .await
    .context("Failed to insert topic")?
    .last_insert_rowid();

    let pid = sqlx::query("INSERT INTO posts (tid, uid, content, timestamp) VALUES (?, ?, ?, ?)")
        .bind(tid)
        .bind(thread.uid)
        .bind(&thread.content)
        .bind(now_millis())
        .execute(&mut *tx)
        .await
        .context("Failed to insert main post")?
        .last_insert_rowid();

    sqlx::query("UPDATE topics SET main_pid = ? WHERE tid = ?")
        .bind(pid)
        .bind(tid)
        .execute(&mut *tx)
        .await
        .context("Failed to set main post")?;

    tx.commit().await.context("Failed to commit topic")?;

    Ok(CreatedThread { tid, pid })
}

pub async fn get_topic(pool: &SqlitePool, tid: i64) -> Result<Option<Topic>> {
    sqlx::query_as("SELECT * FROM topics WHERE tid = ?")
        .bind(tid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic")
}

pub async fn soft_delete_topic(pool: &SqlitePool, tid: i64) -> Result<()> {
    sqlx::query("UPDATE topics SET deleted = 1 WHERE tid = ?")
        .bind(tid)
        .execute(pool)
        .await
        .context("Failed to delete topic")?;
    Ok(())
}

// ========== Posts ==========

pub async fn insert_reply(pool: &SqlitePool, reply: &NewReply) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO posts (tid, uid, content, to_pid, timestamp) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(reply.tid)
    .bind(reply.uid)
    .bind(&reply.content)
    .bind(reply.to_pid)
    .bind(now_millis())
    .execute(pool)
    .await
    .context("Failed to insert reply")?;

    Ok(result.last_insert_rowid())
}

/// Replies of a live topic (root post excluded) in the given window.
pub async fn get_topic_posts(
    pool: &SqlitePool,
    tid: i64,
    window: PageWindow,
    viewer: i64,
) -> Result<Vec<PostRow>> {
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{POST_SELECT} WHERE p.tid = ? AND p.pid != COALESCE(t.main_pid, -1)
         ORDER BY p.timestamp ASC, p.pid ASC
         LIMIT ? OFFSET ?"
    );
    sqlx::query_as(&sql)
        .bind(viewer)
        .bind(viewer)
        .bind(tid)
        .bind(window.len())
        .bind(window.start.max(0))
        .fetch_all(pool)
        .await
        .context("Failed to fetch topic posts")
}

/// Root post of a live topic.
pub async fn get_main_post(pool: &SqlitePool, tid: i64, viewer: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.tid = ? AND p.pid = t.main_pid");
    sqlx::query_as(&sql)
        .bind(viewer)
        .bind(viewer)
        .bind(tid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch main post")
}

pub async fn get_post(pool: &SqlitePool, pid: i64, viewer: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.pid = ?");
    sqlx::query_as(&sql)
        .bind(viewer)
        .bind(viewer)
        .bind(pid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")
}

/// Number of visible posts in a topic, root post included.
pub async fn count_topic_posts(pool: &SqlitePool, tid: i64) -> Result<i64> {
    sqlx::query_scalar(
        r"
        SELECT COUNT(*) FROM posts p
        JOIN topics t ON t.tid = p.tid AND t.deleted = 0
        WHERE p.tid = ? AND p.deleted = 0
        ",
    )
    .bind(tid)
    .fetch_one(pool)
    .await
    .context("Failed to count topic posts")
}

pub async fn soft_delete_post(pool: &SqlitePool, pid: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET deleted = 1 WHERE pid = ?")
        .bind(pid)
        .execute(pool)
        .await
        .context("Failed to delete post")?;
    Ok(())
}

pub async fn set_post_field(pool: &SqlitePool, pid: i64, field: &str, value: &str) -> Result<()> {
    let result = sqlx::query(
        r"
        INSERT INTO post_fields (pid, field, value)
        SELECT ?, ?, ? WHERE EXISTS(SELECT 1 FROM posts WHERE pid = ?)
        ON CONFLICT(pid, field) DO UPDATE SET value = excluded.value
        ",
    )
    .bind(pid)
    .bind(field)
    .bind(value)
    .bind(pid)
    .execute(pool)
    .await
    .context("Failed to set post field")?;

    if result.rows_affected() == 0 {
        bail!("[[error:no-post]]");
    }
    Ok(())
}

pub async fn get_post_field(pool: &SqlitePool, pid: i64, field: &str) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT value FROM post_fields WHERE pid = ? AND field = ?")
        .bind(pid)
        .bind(field)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post field")
}

// ========== Votes & Bookmarks ==========

pub async fn add_vote(pool: &SqlitePool, pid: i64, uid: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_votes (pid, uid) VALUES (?, ?)")
        .bind(pid)
        .bind(uid)
        .execute(pool)
        .await
        .context("Failed to add vote")?;
    Ok(())
}

pub async fn remove_vote(pool: &SqlitePool, pid: i64, uid: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_votes WHERE pid = ? AND uid = ?")
        .bind(pid)
        .bind(uid)
        .execute(pool)
        .await
        .context("Failed to remove vote")?;
    Ok(())
}

pub async fn count_votes(pool: &SqlitePool, pid: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM post_votes WHERE pid = ?")
        .bind(pid)
        .fetch_one(pool)
        .await
        .context("Failed to count votes")
}

pub async fn add_bookmark(pool: &SqlitePool, pid: i64, uid: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_bookmarks (pid, uid) VALUES (?, ?)")
        .bind(pid)
        .bind(uid)
        .execute(pool)
        .await
        .context("Failed to add bookmark")?;
    Ok(())
}

pub async fn remove_bookmark(pool: &SqlitePool, pid: i64, uid: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_bookmarks WHERE pid = ? AND uid = ?")
        .bind(pid)
        .bind(uid)
        .execute(pool)
        .await
        .context("Failed to remove bookmark")?;
    Ok(())
}

pub async fn count_bookmarks(pool: &SqlitePool, pid: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM post_bookmarks WHERE pid = ?")
        .bind(pid)
        .fetch_one(pool)
        .await
        .context("Failed to count bookmarks")
}

// ========== Bindings ==========

pub async fn get_binding(pool: &SqlitePool, namespace: &str, article_id: &str) -> Result<Option<i64>> {
    sqlx::query_scalar("SELECT tid FROM blog_bindings WHERE namespace = ? AND article_id = ?")
        .bind(namespace)
        .bind(article_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch binding")
}

/// Write a binding, replacing any existing one for the same article.
pub async fn upsert_binding(
    pool: &SqlitePool,
    namespace: &str,
    article_id: &str,
    tid: i64,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO blog_bindings (namespace, article_id, tid)
        VALUES (?, ?, ?)
        ON CONFLICT(namespace, article_id)
        DO UPDATE SET tid = excluded.tid, updated_at = datetime('now')
        ",
    )
    .bind(namespace)
    .bind(article_id)
    .bind(tid)
    .execute(pool)
    .await
    .context("Failed to write binding")?;
    Ok(())
}

// ========== Settings ==========

pub async fn get_all_settings(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await
        .context("Failed to fetch settings")
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("Failed to write setting")?;
    Ok(())
}
