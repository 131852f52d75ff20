use std::sync::Arc;

use anyhow::Context;
use chat_orchestrator::{
    config::Config,
    routes,
    services::inference::OllamaClient,
    state::AppState,
    storage,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    // No traffic is served against a store that failed to open.
    let store = storage::open_store(&config)
        .await
        .with_context(|| format!("failed to initialize {} storage", config.storage_kind.as_str()))?;

    let inference = OllamaClient::from_config(&config).context("failed to build inference client")?;
    tracing::info!(
        endpoint = inference.endpoint(),
        model = %config.model,
        timeout = ?config.inference_timeout,
        history_window = ?config.history_window,
        "inference client ready"
    );

    let state = Arc::new(AppState::new(&config, store, Arc::new(inference)));
    let app = routes::create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "chat backend listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
