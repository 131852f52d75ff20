// src/services/health.rs
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, StorageKind};
use crate::storage::SharedStore;

const STORAGE_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Degraded,
}

/// Body of `GET /health`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: Status,
    #[serde(rename = "database")]
    pub storage_kind: StorageKind,
    #[serde(rename = "ollama_host")]
    pub inference_endpoint: String,
    #[serde(rename = "model")]
    pub model_name: String,
}

/// Reports the configured targets and whether storage answers.
///
/// The inference daemon is never contacted: a slow or absent daemon does not
/// change the reported status.
#[derive(Clone)]
pub struct HealthReporter {
    store: SharedStore,
    storage_kind: StorageKind,
    inference_endpoint: String,
    model_name: String,
}

impl HealthReporter {
    pub fn new(config: &Config, store: SharedStore) -> Self {
        Self {
            store,
            storage_kind: config.storage_kind,
            inference_endpoint: config.ollama_host.clone(),
            model_name: config.model.clone(),
        }
    }

    pub async fn report(&self) -> HealthStatus {
        let status = match tokio::time::timeout(STORAGE_PING_TIMEOUT, self.store.ping()).await {
            Ok(Ok(())) => Status::Ok,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "storage ping failed");
                Status::Degraded
            }
            Err(_) => {
                tracing::warn!(timeout = ?STORAGE_PING_TIMEOUT, "storage ping timed out");
                Status::Degraded
            }
        };

        HealthStatus {
            status,
            storage_kind: self.storage_kind,
            inference_endpoint: self.inference_endpoint.clone(),
            model_name: self.model_name.clone(),
        }
    }
}
