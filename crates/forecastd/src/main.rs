//! Forecast Daemon - battery runtime forecasting service
//!
//! Serves the forecast pipeline over HTTP and, optionally, a heuristic
//! prediction service for local runs.

use anyhow::{Context, Result};
use forecast_common::{ForecastConfig, ForecastPipeline};
use forecastd::server::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] Battery Forecast Daemon v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ForecastConfig::load();
    info!("[BOOT] Prediction service: {}", config.prediction.endpoint);
    info!(
        "[BOOT] Generation backend: {} ({:?})",
        config.generation.model, config.generation.api
    );

    let pipeline =
        ForecastPipeline::from_config(&config).context("Failed to build forecast pipeline")?;
    let state = AppState::new(pipeline);

    info!("[BOOT] Ready");
    server::run(state, &config.server).await
}
