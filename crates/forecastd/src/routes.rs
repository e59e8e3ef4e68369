//! API routes for forecastd
//!
//! The forecast routes are thin adapters: decode the transport body into a
//! string mapping and hand it to the pipeline. The pipeline result is always
//! returned with 200; failures travel in its `error` field.

use crate::server::AppState;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use forecast_common::telemetry::raw_input_from_json;
use forecast_common::{model_metrics, ModelMetric, PipelineResult, RawInput, VERSION};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Forecast Routes
// ============================================================================

pub fn forecast_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/forecast", post(forecast_form))
        .route("/v1/forecast/json", post(forecast_json))
}

async fn forecast_form(
    State(state): State<AppStateArc>,
    Form(raw): Form<RawInput>,
) -> Json<PipelineResult> {
    info!("  Forecast request (form, {} fields)", raw.len());
    Json(state.pipeline.run_pipeline(&raw).await)
}

async fn forecast_json(
    State(state): State<AppStateArc>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PipelineResult>, (StatusCode, String)> {
    let raw = raw_input_from_json(&body).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Request body must be a JSON object".to_string(),
        )
    })?;
    info!("  Forecast request (json, {} fields)", raw.len());
    Ok(Json(state.pipeline.run_pipeline(&raw).await))
}

// ============================================================================
// Metrics Routes
// ============================================================================

pub fn metrics_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/metrics", get(metrics))
}

async fn metrics() -> Json<Vec<ModelMetric>> {
    Json(model_metrics())
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
