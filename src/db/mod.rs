pub mod books;
pub mod reviews;
pub mod user;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Error as SqlxError, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = SqlitePool;

pub async fn init_db_pool(db_url: &str) -> Result<DbPool, SqlxError> {
    let connection_options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connection_options)
        .await?;

    // Run migrations
    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied.
pub async fn init_memory_pool() -> Result<DbPool, SqlxError> {
    let connection_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // Every connection to :memory: is its own database, so keep exactly one.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(connection_options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}
