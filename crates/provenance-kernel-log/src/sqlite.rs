//! SQLite implementation of the LogClient trait.
//!
//! A durable local log. It uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use provenance_kernel_core::{ChannelId, LogMessage};

use crate::error::{LogError, Result};
use crate::migration;
use crate::traits::{AppendReceipt, LogClient, ReadOrder};
use crate::{channel_id_for, now_millis};

/// SQLite-based log implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLog {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LogError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LogError::Unavailable(format!("spawn_blocking failed: {e}")))?
    }
}

fn channel_exists(conn: &Connection, channel: &str) -> Result<()> {
    conn.query_row(
        "SELECT 1 FROM channels WHERE channel_id = ?1",
        params![channel],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(|| LogError::ChannelNotFound(channel.to_string()))
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogMessage> {
    let seq: i64 = row.get("seq")?;
    let payload: Vec<u8> = row.get("payload")?;
    Ok(LogMessage::new(seq as u64, row.get("timestamp")?, payload))
}

#[async_trait]
impl LogClient for SqliteLog {
    async fn create_channel(&self, memo: &str) -> Result<ChannelId> {
        let memo = memo.to_string();
        let id = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO channels (memo, created_at) VALUES (?1, ?2)",
                    params![memo, now_millis()],
                )?;
                let rowid = tx.last_insert_rowid();
                let id = channel_id_for(rowid as u64);
                tx.execute(
                    "UPDATE channels SET channel_id = ?1 WHERE id = ?2",
                    params![id.as_str(), rowid],
                )?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        debug!(channel = %id, "created channel");
        Ok(id)
    }

    async fn append_message(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt> {
        let channel = channel.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            channel_exists(&tx, &channel)?;

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE channel_id = ?1",
                params![channel],
                |row| row.get(0),
            )?;
            let timestamp = now_millis();
            tx.execute(
                "INSERT INTO messages (channel_id, seq, timestamp, payload) VALUES (?1, ?2, ?3, ?4)",
                params![channel, seq, timestamp, &payload[..]],
            )?;
            tx.commit()?;

            Ok(AppendReceipt {
                sequence_number: seq as u64,
                timestamp,
            })
        })
        .await
    }

    async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>> {
        let channel = channel.to_string();
        self.run(move |conn| {
            channel_exists(conn, &channel)?;

            let sql = match order {
                ReadOrder::Ascending => {
                    "SELECT seq, timestamp, payload FROM messages WHERE channel_id = ?1 ORDER BY seq ASC LIMIT ?2"
                }
                ReadOrder::Descending => {
                    "SELECT seq, timestamp, payload FROM messages WHERE channel_id = ?1 ORDER BY seq DESC LIMIT ?2"
                }
            };
            // SQLite treats a negative LIMIT as unbounded.
            let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

            let mut stmt = conn.prepare(sql)?;
            let messages = stmt
                .query_map(params![channel, limit], row_to_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }
}
