//! RAG Chatbot Gateway binary
//!
//! Loads configuration, wires the query pipeline to the configured upstream
//! services and serves the API until SIGINT/SIGTERM.

use anyhow::Context;
use ragchat_common::{config::AppConfig, RagPipeline, VERSION};
use ragchat_gateway::{create_router, telemetry, AppState};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    telemetry::init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        version = VERSION,
        "Starting RAG Chatbot Gateway"
    );

    let metrics = telemetry::install_metrics()?;

    let pipeline = RagPipeline::from_config(&config.upstream)?;
    info!(
        embeddings = %config.upstream.embeddings_url(),
        search = %config.upstream.search_url(),
        answer = %config.upstream.answer_url(),
        timeout_secs = config.upstream.timeout_secs,
        "Upstream services configured"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, pipeline, metrics);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
