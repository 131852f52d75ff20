use axum::{Json, extract::State};

use crate::{services::health::HealthStatus, state::SharedState};

// Always 200; a broken store shows up as "degraded" in the body.
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthStatus> {
    Json(state.health.report().await)
}
