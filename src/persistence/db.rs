//! Connection handling for the gateway's history database.
//!
//! Chat history and the topic catalog are append-mostly, low-volume
//! data, so the pool is pinned to one connection: a single writer keeps
//! `SQLite` locking out of the hot path, and the journal mode is chosen
//! by [`schema::apply`] together with the table set.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{AppError, Result};

use super::schema;

/// Alias for the shared `SQLite` connection pool.
pub type Database = SqlitePool;

/// Open the history database at `path`.
///
/// First run creates the file and any missing parent directories.
///
/// # Errors
///
/// Returns `AppError::Db` if the path is unusable, the connection
/// fails, or schema application fails.
pub async fn open(path: &str) -> Result<Database> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            AppError::Db(format!("cannot create '{}': {err}", parent.display()))
        })?;
    }

    let opts = SqliteConnectOptions::from_str(path)
        .map_err(|err| AppError::Db(format!("bad database path '{path}': {err}")))?
        .create_if_missing(true);
    pinned_pool(opts).await
}

/// Open a throwaway in-memory database.
///
/// Used by the one-shot CLI and by tests, where history only needs to
/// outlive the process.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema application fails.
pub async fn open_in_memory() -> Result<Database> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|err| AppError::Db(format!("invalid memory uri: {err}")))?;
    pinned_pool(opts).await
}

/// Build the single-connection pool and bring the schema up to date.
///
/// `min_connections(1)` pins the one connection open for the pool's
/// lifetime; for an in-memory database that connection *is* the
/// database, so it must never be recycled.
async fn pinned_pool(opts: SqliteConnectOptions) -> Result<Database> {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect_with(opts)
        .await?;

    schema::apply(&pool).await?;
    Ok(pool)
}
