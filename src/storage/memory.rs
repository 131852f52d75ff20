// src/storage/memory.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ConversationStore, ConversationTurn};
use crate::config::StorageKind;
use crate::error::StorageError;

/// Process-local store. Nothing survives a restart.
///
/// Reports itself as [`StorageKind::Sqlite`] since it stands in for the
/// embedded backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Vec<ConversationTurn>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one turn.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Sqlite
    }

    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StorageError> {
        let mut guard = self.inner.write().await;
        guard
            .entry(turn.session_id.clone())
            .or_default()
            .push(turn.clone());
        Ok(())
    }

    async fn read_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let guard = self.inner.read().await;
        let Some(turns) = guard.get(session_id) else {
            return Ok(Vec::new());
        };
        let skip = limit.map_or(0, |n| turns.len().saturating_sub(n));
        Ok(turns[skip..].to_vec())
    }

    async fn clear(&self, session_id: &str) -> Result<u64, StorageError> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(session_id).map_or(0, |t| t.len() as u64))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
