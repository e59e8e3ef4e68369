//! Heuristic reference implementation of the prediction service.
//!
//! Speaks the same `POST /predict` contract as the production model so the
//! daemon can run end to end without it. The numbers are a rough
//! capacity-times-factor estimate scaled down by drain rate.

use axum::{extract::rejection::JsonRejection, http::StatusCode, routing::post, Json, Router};
use forecast_common::telemetry::TELEMETRY_FIELDS;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

/// Seconds of runtime per mAh of charge.
const SECONDS_PER_MAH: f64 = 0.08;

/// Drain rate (mWh/s) above which the estimate is cut down.
const SIGNIFICANT_DRAIN_MWH_PER_SEC: f64 = 0.05;

const DRAIN_PENALTY: f64 = 20.0;

const MAX_PREDICTION_SECS: f64 = 3.0 * 24.0 * 3600.0;

pub fn predictor_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/predict", post(predict))
}

async fn predict(body: Result<Json<Value>, JsonRejection>) -> (StatusCode, Json<Value>) {
    let input = match body {
        Ok(Json(Value::Object(map))) => map,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Request must be JSON"})),
            )
        }
    };

    let missing: Vec<&str> = TELEMETRY_FIELDS
        .iter()
        .copied()
        .filter(|field| !input.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Missing fields: {}", missing.join(", "))})),
        );
    }

    match estimate_seconds(&input) {
        Ok(seconds) => {
            debug!("Reference prediction: {:.1}s", seconds);
            (
                StatusCode::OK,
                Json(json!({"predictedTimeLeftSeconds": seconds})),
            )
        }
        Err(e) => {
            error!("Prediction error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e})),
            )
        }
    }
}

/// Estimate remaining seconds from a prediction request body.
pub fn estimate_seconds(input: &Map<String, Value>) -> Result<f64, String> {
    let capacity_percentage = number(input, "capacityPercentage", 0.0)?;
    let full_charge_mah = number(input, "fullChargeCapacityMah", 1.0)?;
    let drained_mwh = number(input, "drainedMwh", 0.0)?;
    let mut duration_seconds = number(input, "durationSeconds", 1.0)?;
    if duration_seconds == 0.0 {
        duration_seconds = 1.0;
    }

    let mut predicted = (capacity_percentage / 100.0) * full_charge_mah * SECONDS_PER_MAH;

    let drain_rate = drained_mwh / duration_seconds;
    if drain_rate > SIGNIFICANT_DRAIN_MWH_PER_SEC {
        predicted /= drain_rate * DRAIN_PENALTY;
    }

    Ok(predicted.clamp(0.0, MAX_PREDICTION_SECS))
}

/// Numeric member, accepting numbers or numeric strings.
fn number(input: &Map<String, Value>, key: &str, default: f64) -> Result<f64, String> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("could not convert {} to float", key)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("could not convert string to float: '{}'", s)),
        Some(other) => Err(format!("could not convert {} to float: {}", key, other)),
    }
}
