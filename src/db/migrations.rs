use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str], what: &str) -> Result<()> {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {what}"))?;
    }
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: forum schema");

    execute_all(
        pool,
        &[
            r"
            CREATE TABLE IF NOT EXISTS users (
                uid INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                picture TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS group_members (
                group_name TEXT NOT NULL,
                uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                PRIMARY KEY (group_name, uid)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                uid INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                csrf_token TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS categories (
                cid INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS topics (
                tid INTEGER PRIMARY KEY AUTOINCREMENT,
                cid INTEGER NOT NULL REFERENCES categories(cid),
                uid INTEGER NOT NULL,
                title TEXT NOT NULL,
                main_pid INTEGER,
                tags TEXT NOT NULL DEFAULT '[]',
                external_link TEXT,
                external_comment TEXT,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS posts (
                pid INTEGER PRIMARY KEY AUTOINCREMENT,
                tid INTEGER NOT NULL REFERENCES topics(tid) ON DELETE CASCADE,
                uid INTEGER NOT NULL,
                content TEXT NOT NULL,
                to_pid INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_posts_tid ON posts(tid, timestamp)",
            r"
            CREATE TABLE IF NOT EXISTS post_fields (
                pid INTEGER NOT NULL REFERENCES posts(pid) ON DELETE CASCADE,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (pid, field)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS post_votes (
                pid INTEGER NOT NULL REFERENCES posts(pid) ON DELETE CASCADE,
                uid INTEGER NOT NULL,
                PRIMARY KEY (pid, uid)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS post_bookmarks (
                pid INTEGER NOT NULL REFERENCES posts(pid) ON DELETE CASCADE,
                uid INTEGER NOT NULL,
                PRIMARY KEY (pid, uid)
            )
            ",
            // Fallback category for sites without a configured one
            r"
            INSERT OR IGNORE INTO categories (cid, name, slug, description)
            VALUES (1, 'Blog Comments', '1/blog-comments', 'Discussion of external articles')
            ",
        ],
        "forum schema",
    )
    .await
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: bridge tables");

    execute_all(
        pool,
        &[
            r"
            CREATE TABLE IF NOT EXISTS blog_bindings (
                namespace TEXT NOT NULL,
                article_id TEXT NOT NULL,
                tid INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (namespace, article_id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            ",
        ],
        "bridge tables",
    )
    .await
}
