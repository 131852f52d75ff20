// src/services/inference.rs
//! Client for the local Ollama daemon.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::InferenceError;
use crate::storage::Role;

/// One entry of the context sent to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Anything that can turn an ordered context into a reply.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(&self, context: &[ChatMessage], model: &str) -> Result<String, InferenceError>;
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Clone, Copy, Debug)]
struct OllamaOptions {
    num_ctx: u32,
    temperature: f32,
}

#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    options: OllamaOptions,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        num_ctx: u32,
        temperature: f32,
    ) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| InferenceError::Unreachable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            options: OllamaOptions { num_ctx, temperature },
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, InferenceError> {
        Self::new(
            &config.ollama_host,
            config.inference_timeout,
            config.num_ctx,
            config.temperature,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate(&self, context: &[ChatMessage], model: &str) -> Result<String, InferenceError> {
        let body = OllamaChatRequest {
            model,
            messages: context,
            stream: false,
            options: self.options,
        };

        tracing::debug!(model, turns = context.len(), endpoint = %self.endpoint, "calling ollama");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(classify_transport_error)?;

        parse_reply(status, &text)
    }
}

fn classify_transport_error(err: reqwest::Error) -> InferenceError {
    if err.is_decode() {
        InferenceError::MalformedResponse(err.to_string())
    } else {
        // Connection refused, DNS, timeouts and broken bodies all mean the
        // daemon did not give us an answer.
        InferenceError::Unreachable(err.to_string())
    }
}

/// Maps a finished daemon response onto a reply or an [`InferenceError`].
fn parse_reply(status: StatusCode, body: &str) -> Result<String, InferenceError> {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let daemon_error = json
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    if !status.is_success() {
        return Err(InferenceError::DaemonError {
            status: status.as_u16(),
            message: daemon_error.unwrap_or_else(|| truncate(body, 200)),
        });
    }

    if let Some(message) = daemon_error {
        return Err(InferenceError::DaemonError { status: status.as_u16(), message });
    }

    let json = json.ok_or_else(|| InferenceError::MalformedResponse(format!("not JSON: {}", truncate(body, 200))))?;
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| InferenceError::MalformedResponse("missing message.content".to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
