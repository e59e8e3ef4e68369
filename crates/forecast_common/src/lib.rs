//! Battery Forecaster common library.
//!
//! Validation, prediction, explanation and feature-importance stages plus the
//! orchestrator that ties them together. The daemon and the CLI are thin
//! adapters over [`ForecastPipeline`].

pub mod config;
pub mod error;
pub mod explanation;
pub mod format;
pub mod generation;
pub mod importance;
pub mod metrics;
pub mod pipeline;
pub mod prediction;
pub mod telemetry;

pub use config::{ForecastConfig, GenerationApi, GenerationConfig, PredictionConfig, ServerConfig};
pub use error::{FieldError, ForecastError, GenerationError, ValidationErrors};
pub use explanation::{ExplanationGenerator, ExplanationInput};
pub use format::FormattedDuration;
pub use generation::{FakeGenerationBackend, GenerationBackend, HttpGenerationBackend};
pub use importance::{DataUri, FeatureImportanceRequest, FeatureImportanceVisualizer};
pub use metrics::{model_metrics, ModelMetric};
pub use pipeline::{ForecastPipeline, PipelineResult};
pub use prediction::{
    FakePredictionService, HttpPredictionClient, PredictionResult, PredictionService,
};
pub use telemetry::{validate_telemetry, BatteryState, RawInput, TelemetryRecord};

/// Crate version, reported by the daemon health endpoint and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
