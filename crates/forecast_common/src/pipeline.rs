//! Forecast pipeline orchestration.
//!
//! Flow:
//! 1. Validate raw input (no network on failure)
//! 2. Predict (terminal on failure)
//! 3. Explain + visualize, issued concurrently and both joined
//! 4. Assemble
//!
//! Invariants:
//! - No stage is retried
//! - A generation failure never discards an obtained prediction
//! - Every failure ends up in the result's `error`; nothing is dropped

use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::explanation::{ExplanationGenerator, ExplanationInput};
use crate::generation::{GenerationBackend, HttpGenerationBackend};
use crate::importance::{FeatureImportanceRequest, FeatureImportanceVisualizer};
use crate::prediction::{HttpPredictionClient, PredictionService};
use crate::telemetry::{validate_telemetry, RawInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Final pipeline output handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineResult {
    #[serde(rename_all = "camelCase")]
    Complete {
        predicted_time_left_seconds: f64,
        explanation: String,
        feature_importance_plot_uri: String,
    },
    /// Prediction obtained, explanation or plot failed.
    #[serde(rename_all = "camelCase")]
    Degraded {
        predicted_time_left_seconds: f64,
        error: String,
    },
    Failed { error: String },
}

impl PipelineResult {
    pub fn failed(error: impl Into<String>) -> Self {
        PipelineResult::Failed {
            error: error.into(),
        }
    }

    pub fn predicted_time_left_seconds(&self) -> Option<f64> {
        match self {
            PipelineResult::Complete {
                predicted_time_left_seconds,
                ..
            }
            | PipelineResult::Degraded {
                predicted_time_left_seconds,
                ..
            } => Some(*predicted_time_left_seconds),
            PipelineResult::Failed { .. } => None,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            PipelineResult::Complete { explanation, .. } => Some(explanation),
            _ => None,
        }
    }

    pub fn feature_importance_plot_uri(&self) -> Option<&str> {
        match self {
            PipelineResult::Complete {
                feature_importance_plot_uri,
                ..
            } => Some(feature_importance_plot_uri),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PipelineResult::Complete { .. } => None,
            PipelineResult::Degraded { error, .. } | PipelineResult::Failed { error } => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// Fold the two enrichment outcomes onto an obtained prediction.
    fn assemble(
        predicted_time_left_seconds: f64,
        explanation: Result<String, ForecastError>,
        plot: Result<String, ForecastError>,
    ) -> Self {
        match (explanation, plot) {
            (Ok(explanation), Ok(feature_importance_plot_uri)) => PipelineResult::Complete {
                predicted_time_left_seconds,
                explanation,
                feature_importance_plot_uri,
            },
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => PipelineResult::Degraded {
                predicted_time_left_seconds,
                error: format!("AI processing failed: {}", e),
            },
            (Err(explain_err), Err(plot_err)) => PipelineResult::Degraded {
                predicted_time_left_seconds,
                error: format!("AI processing failed: {}; {}", explain_err, plot_err),
            },
        }
    }
}

/// Validate → Predict → Explain+Visualize → Assemble.
pub struct ForecastPipeline {
    predictor: Arc<dyn PredictionService>,
    explainer: ExplanationGenerator,
    visualizer: FeatureImportanceVisualizer,
    importance: FeatureImportanceRequest,
}

impl ForecastPipeline {
    pub fn new(
        predictor: Arc<dyn PredictionService>,
        explainer: ExplanationGenerator,
        visualizer: FeatureImportanceVisualizer,
    ) -> Self {
        Self {
            predictor,
            explainer,
            visualizer,
            importance: FeatureImportanceRequest::placeholder(),
        }
    }

    /// Wire HTTP clients from configuration. Both generators share one backend.
    pub fn from_config(config: &ForecastConfig) -> anyhow::Result<Self> {
        let predictor = Arc::new(HttpPredictionClient::new(&config.prediction)?);
        let backend: Arc<dyn GenerationBackend> =
            Arc::new(HttpGenerationBackend::new(config.generation.clone())?);
        info!(
            prediction = %predictor.predict_url(),
            generation = %config.generation.endpoint,
            model = %config.generation.model,
            "Forecast pipeline configured"
        );

        Ok(Self::new(
            predictor,
            ExplanationGenerator::new(backend.clone()),
            FeatureImportanceVisualizer::new(backend),
        ))
    }

    /// Replace the placeholder feature weights.
    pub fn with_importance(mut self, importance: FeatureImportanceRequest) -> Self {
        self.importance = importance;
        self
    }

    /// Run the whole pipeline for one request.
    pub async fn run_pipeline(&self, raw: &RawInput) -> PipelineResult {
        let request_id = Uuid::new_v4();
        self.run_stages(raw)
            .instrument(info_span!("forecast", %request_id))
            .await
    }

    async fn run_stages(&self, raw: &RawInput) -> PipelineResult {
        let record = match validate_telemetry(raw) {
            Ok(record) => record,
            Err(errors) => {
                let err = ForecastError::Validation(errors);
                warn!(stage = err.stage(), "{}", err);
                return PipelineResult::failed(err.to_string());
            }
        };
        info!(state = %record.state, "Telemetry validated");

        let prediction = match self.predictor.predict(&record).await {
            Ok(prediction) => prediction,
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Prediction failed");
                return PipelineResult::failed(format!("Prediction failed: {}", e));
            }
        };
        let predicted = prediction.predicted_time_left_seconds;
        info!(predicted_time_left_seconds = predicted, "Prediction received");

        let input = ExplanationInput::derive(&record, &prediction);
        let (explanation, plot) = tokio::join!(
            self.explainer.explain(&input),
            self.visualizer.visualize(&self.importance)
        );

        for e in [&explanation, &plot].into_iter().filter_map(|r| r.as_ref().err()) {
            warn!(stage = e.stage(), error = %e, "Enrichment failed, keeping prediction");
        }

        let result = PipelineResult::assemble(predicted, explanation, plot);
        info!(complete = !result.is_error(), "Forecast assembled");
        result
    }
}
