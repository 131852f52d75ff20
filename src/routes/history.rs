use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    error::AppError,
    message::{ClearQuery, ClearResponse, HistoryEntry, HistoryQuery, HistoryResponse},
    services::session_manager::SessionManager,
    state::SharedState,
};

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub async fn get_history_handler(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session_id = SessionManager::resolve(query.session_id.as_deref());
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let turns = state.store.read_history(&session_id, Some(limit)).await?;
    Ok(Json(HistoryResponse {
        session_id,
        history: turns.into_iter().map(HistoryEntry::from).collect(),
    }))
}

pub async fn clear_history_handler(
    State(state): State<SharedState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>, AppError> {
    let session_id = SessionManager::resolve(query.session_id.as_deref());
    let removed = state.store.clear(&session_id).await?;
    tracing::info!(session_id = %session_id, removed, "history cleared");

    Ok(Json(ClearResponse {
        status: "cleared".to_string(),
        session_id,
        removed,
    }))
}
