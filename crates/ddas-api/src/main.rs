//! # ddas-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the archive API.
//! Binds to configurable port (default 8080).

use ddas_api::{AppConfig, AppState};
use ddas_archive::{build_archiver, ArchiveConfig};
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("DDAS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let archive_config = ArchiveConfig::from_env().map_err(|e| {
        tracing::error!("Invalid archive configuration: {e}");
        e
    })?;
    tracing::info!(config = ?archive_config, "archive configuration loaded");

    let config = AppConfig::from_env(archive_config.request_timeout);
    if config.auth_token.is_none() {
        tracing::warn!(
            "AUTH_TOKEN not set; callers are identified by the X-Owner-Id header (development mode)"
        );
    }

    let archiver = build_archiver(&archive_config).await.map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    let port = config.port;
    let mut state = AppState::new(archiver, config);
    if state.config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_metrics(handle);
    }

    let app = ddas_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("DDAS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
