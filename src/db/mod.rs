//! SQLite storage for the forum side of the bridge.
//!
//! Free query functions live in [`queries`]; [`Database`] wraps the pool and
//! implements every collaborator trait on top of them.

mod migrations;
mod models;
mod queries;
mod store;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Concurrent publishes and votes contend for the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_CONNECTIONS: u32 = 5;

fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the forum database and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for writing or a
    /// migration fails.
    pub async fn new(path: &Path) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_options(path))
            .await
            .with_context(|| format!("Failed to open forum database at {}", path.display()))?;

        // A read-only mount only fails once something writes; surface it now.
        let tx = pool
            .begin()
            .await
            .with_context(|| format!("Forum database at {} is not writable", path.display()))?;
        tx.commit().await.context("Failed to commit writability check")?;

        migrations::run(&pool).await?;
        info!(path = %path.display(), "Forum database ready");

        Ok(Self { pool })
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
