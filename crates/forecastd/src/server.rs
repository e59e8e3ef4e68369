//! HTTP server for forecastd

use crate::{reference_predictor, routes};
use anyhow::{Context, Result};
use axum::Router;
use forecast_common::{ForecastPipeline, ServerConfig};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted request body. Forecast requests are a handful of fields.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: ForecastPipeline,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pipeline: ForecastPipeline) -> Self {
        Self {
            pipeline,
            start_time: Instant::now(),
        }
    }
}

/// Build the router. The reference `/predict` service is mounted only when enabled.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .merge(routes::forecast_routes())
        .merge(routes::metrics_routes())
        .merge(routes::health_routes());

    if config.reference_predictor {
        app = app.merge(reference_predictor::predictor_routes());
    }

    app.with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state, config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("  Listening on http://{}", config.bind_addr);
    if config.reference_predictor {
        info!("  Reference predictor enabled at /predict");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
