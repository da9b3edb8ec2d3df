//! Record store connection management
//!
//! SQLite in WAL mode so parallel worker processes can read while one
//! writes. All timestamp columns are written exclusively through bound
//! `chrono` values, never SQL datetime functions, so every stored value
//! shares one text encoding and range comparisons in SQL stay sound.

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::time::Duration;

/// Connection cap for a single process. Workers are process-parallel, not
/// task-parallel, so a small pool per process is plenty.
const MAX_CONNECTIONS: u32 = 5;

/// Open (creating if missing) the store at the configured path and bring
/// the schema up to date.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(path = %config.path, "Record store opened");

    Ok(pool)
}

/// In-memory store for tests. Pinned to a single connection: every SQLite
/// `:memory:` connection is its own database, so a larger pool would hand
/// out empty databases.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub async fn health_check(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
