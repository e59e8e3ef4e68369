//! Prediction service client.
//!
//! Production code uses [`HttpPredictionClient`], which POSTs the validated
//! telemetry to `<endpoint>/predict`. Tests use [`FakePredictionService`] with
//! pre-configured responses.

use crate::config::PredictionConfig;
use crate::error::ForecastError;
use crate::telemetry::TelemetryRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Scalar time-remaining estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub predicted_time_left_seconds: f64,
}

impl PredictionResult {
    /// Type-check a service response body.
    pub fn from_response_body(body: &str) -> Result<Self, ForecastError> {
        let invalid = || ForecastError::Format("Invalid prediction format received from service.".to_string());
        let value: serde_json::Value = serde_json::from_str(body).map_err(|_| invalid())?;
        value
            .get("predictedTimeLeftSeconds")
            .and_then(|v| v.as_f64())
            .map(|predicted_time_left_seconds| Self {
                predicted_time_left_seconds,
            })
            .ok_or_else(invalid)
    }
}

/// Anything that can turn telemetry into a time-remaining estimate.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, record: &TelemetryRecord) -> Result<PredictionResult, ForecastError>;
}

/// HTTP client for the external prediction service. One attempt per call.
pub struct HttpPredictionClient {
    client: reqwest::Client,
    predict_url: String,
    timeout_secs: u64,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            predict_url: format!("{}/predict", config.endpoint.trim_end_matches('/')),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(&self, record: &TelemetryRecord) -> Result<PredictionResult, ForecastError> {
        debug!(url = %self.predict_url, ?record, "Sending telemetry to prediction service");

        let response = self
            .client
            .post(&self.predict_url)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForecastError::Transport(format!("timed out after {} seconds", self.timeout_secs))
                } else {
                    ForecastError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ForecastError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(ForecastError::Service {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        debug!(body = %body, "Received prediction");
        PredictionResult::from_response_body(&body)
    }
}

/// Scripted prediction service for tests.
///
/// Repeats a single response forever, or pops a sequence in order.
pub struct FakePredictionService {
    responses: Mutex<Vec<Result<PredictionResult, ForecastError>>>,
    received: Mutex<Vec<TelemetryRecord>>,
}

impl FakePredictionService {
    pub fn new(responses: Vec<Result<PredictionResult, ForecastError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Always predict `seconds`.
    pub fn returning(seconds: f64) -> Self {
        Self::new(vec![Ok(PredictionResult {
            predicted_time_left_seconds: seconds,
        })])
    }

    pub fn always_error(error: ForecastError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Records passed to `predict`, in call order.
    pub fn received(&self) -> Vec<TelemetryRecord> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionService for FakePredictionService {
    async fn predict(&self, record: &TelemetryRecord) -> Result<PredictionResult, ForecastError> {
        self.received.lock().unwrap().push(record.clone());

        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(ForecastError::Transport("no scripted response".to_string())),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}
