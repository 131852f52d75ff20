#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chat_orchestrator::config::{Config, StorageKind};
use chat_orchestrator::error::{InferenceError, StorageError};
use chat_orchestrator::services::inference::{ChatMessage, InferenceBackend};
use chat_orchestrator::storage::{ConversationStore, ConversationTurn, MemoryStore};

/// What the fake daemon does when called.
#[derive(Clone, Debug)]
pub enum Script {
    Reply(String),
    Unreachable,
    DaemonError,
}

/// Inference backend that records every context it receives.
pub struct FakeInference {
    script: Mutex<Script>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeInference {
    pub fn replying(reply: &str) -> Arc<Self> {
        Self::scripted(Script::Reply(reply.to_string()))
    }

    pub fn scripted(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Vec<ChatMessage> {
        self.contexts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl InferenceBackend for FakeInference {
    async fn generate(&self, context: &[ChatMessage], _model: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_vec());
        match self.script.lock().unwrap().clone() {
            Script::Reply(text) => Ok(text),
            Script::Unreachable => Err(InferenceError::Unreachable("connection refused".into())),
            Script::DaemonError => Err(InferenceError::DaemonError {
                status: 500,
                message: "model crashed".into(),
            }),
        }
    }
}

/// Memory store that counts reads and writes.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    appends: AtomicUsize,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationStore for CountingStore {
    fn kind(&self) -> StorageKind {
        self.inner.kind()
    }

    async fn init(&self) -> Result<(), StorageError> {
        self.inner.init().await
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StorageError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append(turn).await
    }

    async fn read_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_history(session_id, limit).await
    }

    async fn clear(&self, session_id: &str) -> Result<u64, StorageError> {
        self.inner.clear(session_id).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.inner.ping().await
    }
}

pub fn test_config(pairs: &[(&str, &str)]) -> Config {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}
