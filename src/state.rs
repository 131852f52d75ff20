// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::health::HealthReporter;
use crate::services::inference::InferenceBackend;
use crate::services::orchestrator::ChatOrchestrator;
use crate::storage::SharedStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub chat: ChatOrchestrator,
    pub health: HealthReporter,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(config: &Config, store: SharedStore, inference: Arc<dyn InferenceBackend>) -> Self {
        Self {
            chat: ChatOrchestrator::new(
                store.clone(),
                inference,
                config.history_window,
                config.model.clone(),
            ),
            health: HealthReporter::new(config, store.clone()),
            store,
        }
    }
}
