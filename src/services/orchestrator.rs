// src/services/orchestrator.rs
use std::sync::Arc;

use crate::error::AppError;
use crate::message::{ChatRequest, ChatResponse};
use crate::services::history::HistoryAssembler;
use crate::services::inference::InferenceBackend;
use crate::services::session_manager::SessionManager;
use crate::storage::{ConversationTurn, Role, SharedStore};

/// Runs one chat exchange end to end.
///
/// Both turns of an exchange are written only after the model has answered,
/// user turn first. A failed generation therefore leaves the session
/// untouched. The per-session lock is held from reading history until both
/// turns are stored, so concurrent requests on one session cannot interleave.
#[derive(Clone)]
pub struct ChatOrchestrator {
    store: SharedStore,
    inference: Arc<dyn InferenceBackend>,
    history: HistoryAssembler,
    sessions: SessionManager,
    model: String,
}

impl ChatOrchestrator {
    pub fn new(
        store: SharedStore,
        inference: Arc<dyn InferenceBackend>,
        history_window: Option<usize>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            history: HistoryAssembler::new(store.clone(), history_window),
            store,
            inference,
            sessions: SessionManager::new(),
            model: model.into(),
        }
    }

    #[tracing::instrument(skip_all, fields(session_id = tracing::field::Empty, use_history = request.use_history))]
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AppError::BadRequest("Message cannot be empty".to_string()));
        }

        let session_id = SessionManager::resolve(request.session_id.as_deref());
        tracing::Span::current().record("session_id", session_id.as_str());

        let _session = self.sessions.lock(&session_id).await;

        let context = self
            .history
            .assemble(&session_id, request.use_history, message)
            .await?;
        tracing::debug!(context_len = context.len(), "context assembled");

        let reply = self.inference.generate(&context, &self.model).await?;

        self.store
            .append(&ConversationTurn::new(&session_id, Role::User, message))
            .await?;
        if let Err(e) = self
            .store
            .append(&ConversationTurn::new(&session_id, Role::Assistant, &reply))
            .await
        {
            tracing::warn!(error = %e, "assistant turn not stored; user turn left without a reply");
            return Err(e.into());
        }

        tracing::info!(reply_len = reply.len(), "chat exchange stored");
        Ok(ChatResponse {
            reply,
            session_id,
            model: self.model.clone(),
        })
    }
}
