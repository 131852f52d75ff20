// src/storage/sqlite.rs
//! Embedded backend: one SQLite file next to the process.
//!
//! SQLite allows a single writer at a time, so appends go through a
//! one-connection writer pool while reads use a small read-only pool. The file
//! runs in WAL mode so readers never block the writer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};

use super::{ConversationStore, ConversationTurn, sql_limit};
use crate::config::StorageKind;
use crate::error::StorageError;

const READER_CONNECTIONS: u32 = 4;

#[derive(Clone, Debug)]
pub struct SqliteStore {
    reader: SqlitePool,
    writer: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file named by `url`.
    ///
    /// Accepts `sqlite://chat.db`, `sqlite:chat.db`, `sqlite:///./chat.db` or a
    /// bare file path.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let path = database_path(url);
        tracing::debug!(path, "opening sqlite database");

        let base = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base.clone())
            .await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(base.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Strips the URL scheme off a SQLite connection target.
fn database_path(url: &str) -> &str {
    url.strip_prefix("sqlite:///./")
        .or_else(|| url.strip_prefix("sqlite://"))
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

fn turn_from_row(row: &SqliteRow) -> Result<ConversationTurn, StorageError> {
    let role: String = row.try_get("role")?;
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("invalid created_at '{created_at}': {e}")))?;

    Ok(ConversationTurn {
        session_id: row.try_get("session_id")?,
        role: role.parse()?,
        content: row.try_get("content")?,
        created_at,
    })
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Sqlite
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversation_turns (
                   id INTEGER PRIMARY KEY AUTOINCREMENT,
                   session_id TEXT NOT NULL,
                   role TEXT NOT NULL,
                   content TEXT NOT NULL,
                   created_at TEXT NOT NULL
               )"#,
        )
        .execute(&self.writer)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_session_created \
             ON conversation_turns (session_id, created_at)",
        )
        .execute(&self.writer)
        .await?;

        Ok(())
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO conversation_turns (session_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&turn.session_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.writer)
        .await?;
        Ok(())
    }

    async fn read_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        // Newest `limit` rows by insertion id, flipped back to oldest first.
        let rows = sqlx::query(
            r#"SELECT session_id, role, content, created_at FROM (
                   SELECT id, session_id, role, content, created_at
                   FROM conversation_turns
                   WHERE session_id = ?1
                   ORDER BY id DESC
                   LIMIT ?2
               ) AS recent
               ORDER BY id ASC"#,
        )
        .bind(session_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.reader)
        .await?;

        rows.iter().map(turn_from_row).collect()
    }

    async fn clear(&self, session_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.writer)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.reader).await?;
        Ok(())
    }
}
