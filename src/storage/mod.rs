// src/storage/mod.rs
//! Conversation persistence.
//!
//! [`ConversationStore`] is the single interface the orchestrator talks to.
//! Which implementation backs it is decided once, at startup, by
//! [`open_store`] from the configured [`StorageKind`]:
//!
//! - [`sqlite::SqliteStore`] — a single local file, no server process.
//! - [`postgres::PostgresStore`] — a separately running PostgreSQL server.
//!
//! [`memory::MemoryStore`] implements the same contract without any I/O and is
//! what the tests run against.

pub mod memory;
pub mod postgres;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, StorageKind};
use crate::error::StorageError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

pub type SharedStore = Arc<dyn ConversationStore>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(StorageError::Corrupt(format!("unknown role '{other}'"))),
        }
    }
}

/// One stored message. Never modified after it has been appended.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationTurn {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Storage backend for conversation turns.
///
/// Implementations must be safe to share across concurrent request handlers.
/// `append` is atomic per call, and `read_history` returns a session's turns in
/// the order they were appended.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Creates the schema if it is missing. Safe to call repeatedly.
    async fn init(&self) -> Result<(), StorageError>;

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StorageError>;

    /// Turns of `session_id`, oldest first. With a `limit`, only the newest
    /// `limit` turns are returned (still oldest first). An unknown session
    /// yields an empty list.
    async fn read_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StorageError>;

    /// Deletes every turn of `session_id`, returning how many were removed.
    async fn clear(&self, session_id: &str) -> Result<u64, StorageError>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Opens the configured backend and makes sure its schema exists.
///
/// Any error here must stop the process before it starts serving.
pub async fn open_store(config: &Config) -> Result<SharedStore, StorageError> {
    let store: SharedStore = match config.storage_kind {
        StorageKind::Sqlite => Arc::new(SqliteStore::connect(&config.database_url).await?),
        StorageKind::Postgres => Arc::new(PostgresStore::connect(&config.database_url).await?),
    };
    store.init().await?;
    tracing::info!(kind = store.kind().as_str(), "storage initialized");
    Ok(store)
}

/// Converts a caller-supplied limit to a SQL `LIMIT` value.
pub(crate) fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(i64::MAX, |n| i64::try_from(n).unwrap_or(i64::MAX))
}
