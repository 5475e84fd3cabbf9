//! History database schema.
//!
//! [`apply`] runs on every open and must converge: idempotent pragmas
//! and `CREATE ... IF NOT EXISTS` statements only, so an existing
//! database and a fresh one end up identical.

use sqlx::SqlitePool;

use crate::Result;

/// Bring a freshly opened database up to the current schema.
///
/// Switches the journal to WAL first (a no-op for in-memory databases,
/// which report `memory`), then creates the two tables: `chat_message`
/// holds conversation entries keyed by the deterministic history key,
/// `topic` holds the catalog rows behind topic listings.
///
/// # Errors
///
/// Returns `AppError::Db` if any statement fails.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS chat_message (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            history_key TEXT NOT NULL,
            message_id INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        "CREATE INDEX IF NOT EXISTS idx_chat_message_key
         ON chat_message (history_key)",
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS topic (
            topic_id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL,
            chat_id INTEGER NOT NULL,
            thread_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            group_slug TEXT,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
