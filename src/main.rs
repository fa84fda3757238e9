// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::telemetry_client::SystemClock;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::config::load_config;
use crate::infrastructure::credentials::EnvCredentialProvider;
use crate::infrastructure::http_client::HttpTelemetryClient;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;
    let view_settings = config.view_settings()?;

    // Backend client (infrastructure layer)
    let credentials = Arc::new(EnvCredentialProvider::new(
        config.backend.token.clone(),
        config.backend.role,
    ));
    let client = Arc::new(
        HttpTelemetryClient::new(&config.backend, credentials)
            .context("building telemetry backend client")?,
    );

    // Services (application layer)
    let telemetry_service = TelemetryService::new(client, Arc::new(SystemClock), view_settings);
    let state = Arc::new(AppState::new(telemetry_service, config.live.mode));

    // Router (presentation layer)
    let router = build_router(state.clone());

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind {}", config.server.bind))?;
    tracing::info!(%addr, backend = %config.backend.host, "Starting device-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.close_all();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
