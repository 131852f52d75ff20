// src/services/session_manager.rs
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Entries beyond this count trigger a sweep of locks nobody is holding.
const PURGE_THRESHOLD: usize = 1024;

/// Hands out one lock per session so that requests on the same session run
/// one after another while different sessions proceed in parallel.
#[derive(Clone, Default)]
pub struct SessionManager {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Blank or missing ids fall back to the shared default session.
    pub fn resolve(session_id: Option<&str>) -> String {
        match session_id.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => DEFAULT_SESSION_ID.to_string(),
        }
    }

    /// Waits until no other request holds `session_id`, then holds it until
    /// the returned guard is dropped.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut guard = self.inner.lock().await;
            if guard.len() >= PURGE_THRESHOLD {
                Self::purge_idle(&mut guard);
            }
            guard.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of sessions currently tracked.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // A lock only referenced by the table has no holder and no waiter.
    fn purge_idle(table: &mut HashMap<String, Arc<Mutex<()>>>) {
        let before = table.len();
        table.retain(|_, lock| Arc::strong_count(lock) > 1);
        tracing::debug!(removed = before - table.len(), "purged idle session locks");
    }
}
