// src/config.rs
//! Process-wide settings, read once from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://chat.db";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "phi";
pub const DEFAULT_PORT: u16 = 8000;

/// Which storage backend the process runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Single local SQLite file.
    Sqlite,
    /// PostgreSQL server.
    Postgres,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Sqlite => "sqlite",
            StorageKind::Postgres => "postgres",
        }
    }
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "embedded" => Ok(StorageKind::Sqlite),
            "postgres" | "postgresql" | "relational" => Ok(StorageKind::Postgres),
            _ => Err(ConfigError::UnknownStorageKind {
                var: "DATABASE_TYPE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_kind: StorageKind,
    pub database_url: String,
    pub ollama_host: String,
    pub model: String,
    pub inference_timeout: Duration,
    pub num_ctx: u32,
    pub temperature: f32,
    /// Prior turns sent with `use_history`; `None` means the whole session.
    pub history_window: Option<usize>,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the
    /// real process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_kind = match get("DATABASE_TYPE") {
            Some(v) => v.parse()?,
            None => StorageKind::Sqlite,
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let ollama_host = get("OLLAMA_HOST")
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());

        let timeout_secs: u64 = parse_var(&get, "OLLAMA_TIMEOUT_SECS", 120)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "OLLAMA_TIMEOUT_SECS",
                value: "0".into(),
                reason: "timeout must be positive".into(),
            });
        }

        let window: usize = parse_var(&get, "HISTORY_WINDOW", 6)?;

        Ok(Self {
            storage_kind,
            database_url,
            ollama_host,
            model,
            inference_timeout: Duration::from_secs(timeout_secs),
            num_ctx: parse_var(&get, "OLLAMA_NUM_CTX", 1024)?,
            temperature: parse_var(&get, "OLLAMA_TEMPERATURE", 0.7)?,
            history_window: (window > 0).then_some(window),
            bind_addr: parse_var(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))?,
        })
    }
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
