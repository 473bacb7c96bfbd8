//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that moves the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{LogError, Result};
use crate::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(LogError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: channels and their messages.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id TEXT UNIQUE,            -- opaque id handed to callers
            memo TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE messages (
            channel_id TEXT NOT NULL REFERENCES channels(channel_id),
            seq INTEGER NOT NULL,              -- 1-indexed, per channel
            timestamp INTEGER NOT NULL,        -- acceptance time (Unix ms)
            payload BLOB NOT NULL,

            UNIQUE(channel_id, seq)
        );

        CREATE INDEX idx_messages_channel_seq ON messages(channel_id, seq);
        "#,
    )?;

    Ok(())
}
