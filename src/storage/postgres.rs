// src/storage/postgres.rs
//! Relational backend on a separately running PostgreSQL server.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};

use super::{ConversationStore, ConversationTurn, sql_limit};
use crate::config::StorageKind;
use crate::error::StorageError;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
/// Server-side cap on any single statement, in milliseconds.
const STATEMENT_TIMEOUT_MS: &str = "5000";

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = PgConnectOptions::from_str(url)?
            .options([("statement_timeout", STATEMENT_TIMEOUT_MS)]);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

fn turn_from_row(row: &PgRow) -> Result<ConversationTurn, StorageError> {
    let role: String = row.try_get("role")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(ConversationTurn {
        session_id: row.try_get("session_id")?,
        role: role.parse()?,
        content: row.try_get("content")?,
        created_at,
    })
}

#[async_trait]
impl ConversationStore for PostgresStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Postgres
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversation_turns (
                   id BIGSERIAL PRIMARY KEY,
                   session_id TEXT NOT NULL,
                   role TEXT NOT NULL,
                   content TEXT NOT NULL,
                   created_at TIMESTAMPTZ NOT NULL DEFAULT now()
               )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_session_created \
             ON conversation_turns (session_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO conversation_turns (session_id, role, content, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&turn.session_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn read_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT session_id, role, content, created_at FROM (
                   SELECT id, session_id, role, content, created_at
                   FROM conversation_turns
                   WHERE session_id = $1
                   ORDER BY id DESC
                   LIMIT $2
               ) AS recent
               ORDER BY id ASC"#,
        )
        .bind(session_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(turn_from_row).collect()
    }

    async fn clear(&self, session_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
