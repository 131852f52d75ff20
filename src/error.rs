// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Invalid or unparsable environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: unknown storage kind '{value}' (expected sqlite or postgres)")]
    UnknownStorageKind { var: &'static str, value: String },

    #[error("{var}: invalid value '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a turn.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Failures talking to the local generation daemon.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference daemon unreachable: {0}")]
    Unreachable(String),

    #[error("malformed response from inference daemon: {0}")]
    MalformedResponse(String),

    #[error("inference daemon error ({status}): {message}")]
    DaemonError { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Inference(InferenceError::Unreachable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Inference(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "chat request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "rejected request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
