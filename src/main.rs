// =============================================================================
// Tidemark Signal Service: Main Entry Point
// =============================================================================

mod api;
mod app_state;
mod indicators;
mod market_data;
mod runtime_config;
mod signal;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::GatewayClient;
use crate::runtime_config::RuntimeConfig;
use crate::signal::report::LogSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tidemark signal service starting up");

    let mut config = RuntimeConfig::load("runtime_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Environment overrides.
    if let Ok(addr) = std::env::var("TIDEMARK_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(url) = std::env::var("TIDEMARK_GATEWAY_URL") {
        config.gateway_base_url = url;
    }
    if let Ok(token) = std::env::var("TIDEMARK_GATEWAY_TOKEN") {
        config.gateway_api_token = Some(token);
    }

    info!(
        gateway = %config.gateway_base_url,
        timeframe = %config.analysis.timeframe,
        atr_period = config.analysis.atr_period,
        "configuration ready"
    );

    let gateway = GatewayClient::new(
        config.gateway_base_url.clone(),
        config.gateway_api_token.as_deref(),
    );

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, gateway, Arc::new(LogSink)));

    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}
