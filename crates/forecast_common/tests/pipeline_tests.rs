//! Deterministic pipeline tests.
//!
//! These tests use FakePredictionService and FakeGenerationBackend to verify
//! the orchestration flow without any network calls.

use forecast_common::{
    ExplanationGenerator, ExplanationInput, FakeGenerationBackend, FakePredictionService,
    FeatureImportanceRequest, FeatureImportanceVisualizer, ForecastError, ForecastPipeline,
    GenerationError, PipelineResult, RawInput,
};
use std::sync::Arc;

const PLOT_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

fn scenario_input() -> RawInput {
    [
        ("state", "Active"),
        ("capacityPercentage", "80"),
        ("designCapacityMah", "42000"),
        ("durationSeconds", "3600"),
        ("currentEnergyMwh", "30000"),
        ("fullChargeCapacityMah", "40000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

struct Harness {
    predictor: Arc<FakePredictionService>,
    text: Arc<FakeGenerationBackend>,
    image: Arc<FakeGenerationBackend>,
    pipeline: ForecastPipeline,
}

fn harness(
    predictor: FakePredictionService,
    text: FakeGenerationBackend,
    image: FakeGenerationBackend,
) -> Harness {
    let predictor = Arc::new(predictor);
    let text = Arc::new(text);
    let image = Arc::new(image);
    let pipeline = ForecastPipeline::new(
        predictor.clone(),
        ExplanationGenerator::new(text.clone()),
        FeatureImportanceVisualizer::new(image.clone()),
    );
    Harness {
        predictor,
        text,
        image,
        pipeline,
    }
}

fn explanation_ok() -> FakeGenerationBackend {
    FakeGenerationBackend::always_valid(serde_json::json!({
        "explanation": "You have roughly two and a half hours left at 80% charge."
    }))
}

fn plot_ok() -> FakeGenerationBackend {
    FakeGenerationBackend::always_valid(serde_json::json!({ "plotDataUri": PLOT_URI }))
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_all_services_succeed() {
    let h = harness(FakePredictionService::returning(9000.0), explanation_ok(), plot_ok());

    let result = h.pipeline.run_pipeline(&scenario_input()).await;

    assert_eq!(result.predicted_time_left_seconds(), Some(9000.0));
    assert!(result.explanation().unwrap().contains("two and a half hours"));
    assert_eq!(result.feature_importance_plot_uri(), Some(PLOT_URI));
    assert_eq!(result.error(), None);

    let json = serde_json::to_value(&result).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert!(!object.contains_key("error"));
}

#[tokio::test]
async fn test_scenario_capacity_reaches_explanation_prompt() {
    let h = harness(FakePredictionService::returning(9000.0), explanation_ok(), plot_ok());

    let result = h.pipeline.run_pipeline(&scenario_input()).await;
    assert_eq!(result.predicted_time_left_seconds(), Some(9000.0));

    let sent = h.predictor.received();
    assert_eq!(sent.len(), 1);
    let input = ExplanationInput::derive(
        &sent[0],
        &forecast_common::PredictionResult {
            predicted_time_left_seconds: 9000.0,
        },
    );
    assert_eq!(input.capacity, 32000.0);

    let prompt = &h.text.prompts()[0];
    assert!(prompt.contains("Capacity: 32000 mAh"));
    assert!(prompt.contains("Predicted Time Left: 9000 seconds"));
}

#[tokio::test]
async fn test_both_generators_called_once() {
    let h = harness(FakePredictionService::returning(1.0), explanation_ok(), plot_ok());
    h.pipeline.run_pipeline(&scenario_input()).await;
    assert_eq!(h.predictor.call_count(), 1);
    assert_eq!(h.text.call_count(), 1);
    assert_eq!(h.image.call_count(), 1);
}

// ============================================================================
// Validation short-circuit
// ============================================================================

#[tokio::test]
async fn test_out_of_range_capacity_makes_no_calls() {
    for value in ["-5", "100.01", "1000"] {
        let h = harness(FakePredictionService::returning(9000.0), explanation_ok(), plot_ok());
        let mut input = scenario_input();
        input.insert("capacityPercentage".to_string(), value.to_string());

        let result = h.pipeline.run_pipeline(&input).await;

        let error = result.error().unwrap();
        assert!(error.contains("capacityPercentage:"), "{}", error);
        assert!(!error.contains("state:"), "{}", error);
        assert_eq!(result.predicted_time_left_seconds(), None);
        assert_eq!(h.predictor.call_count(), 0);
        assert_eq!(h.text.call_count(), 0);
        assert_eq!(h.image.call_count(), 0);
    }
}

#[tokio::test]
async fn test_validation_message_lists_every_field() {
    let h = harness(FakePredictionService::returning(1.0), explanation_ok(), plot_ok());
    let mut input = scenario_input();
    input.remove("state");
    input.insert("durationSeconds".to_string(), "0".to_string());

    let result = h.pipeline.run_pipeline(&input).await;
    assert_eq!(
        result,
        PipelineResult::failed(
            "Invalid input. Please check the form fields. state: Required; durationSeconds: Number must be greater than or equal to 1"
        )
    );
}

// ============================================================================
// Prediction failures are terminal
// ============================================================================

#[tokio::test]
async fn test_prediction_service_error_is_terminal() {
    let h = harness(
        FakePredictionService::always_error(ForecastError::Service {
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: "model exploded".to_string(),
        }),
        explanation_ok(),
        plot_ok(),
    );

    let result = h.pipeline.run_pipeline(&scenario_input()).await;

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!({
            "error": "Prediction failed: Prediction service failed: 500 Internal Server Error - model exploded"
        })
    );
    assert_eq!(h.text.call_count(), 0);
    assert_eq!(h.image.call_count(), 0);
}

#[tokio::test]
async fn test_prediction_format_and_transport_errors() {
    let cases = [
        (
            ForecastError::Format("Invalid prediction format received from service.".to_string()),
            "Prediction failed: Invalid prediction format received from service.",
        ),
        (
            ForecastError::Transport("connection refused".to_string()),
            "Prediction failed: Could not reach prediction service: connection refused",
        ),
    ];
    for (err, expected) in cases {
        let h = harness(FakePredictionService::always_error(err), explanation_ok(), plot_ok());
        let result = h.pipeline.run_pipeline(&scenario_input()).await;
        assert_eq!(result, PipelineResult::failed(expected));
    }
}

// ============================================================================
// Partial failure keeps the prediction
// ============================================================================

#[tokio::test]
async fn test_text_generation_failure_keeps_prediction() {
    let h = harness(
        FakePredictionService::returning(9000.0),
        FakeGenerationBackend::always_error(GenerationError::Http("HTTP 503 from Ollama".into())),
        plot_ok(),
    );

    let result = h.pipeline.run_pipeline(&scenario_input()).await;

    assert_eq!(result.predicted_time_left_seconds(), Some(9000.0));
    assert_eq!(result.explanation(), None);
    assert_eq!(result.feature_importance_plot_uri(), None);
    assert_eq!(
        result.error(),
        Some("AI processing failed: Explanation generation failed: HTTP error: HTTP 503 from Ollama")
    );
    // The plot call still ran
    assert_eq!(h.image.call_count(), 1);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("explanation").is_none());
    assert_eq!(json["predictedTimeLeftSeconds"], 9000.0);
}

#[tokio::test]
async fn test_plot_failure_keeps_prediction() {
    let h = harness(
        FakePredictionService::returning(4200.0),
        explanation_ok(),
        FakeGenerationBackend::always_valid(serde_json::json!({"plotDataUri": "https://x/y.png"})),
    );

    let result = h.pipeline.run_pipeline(&scenario_input()).await;

    assert_eq!(result.predicted_time_left_seconds(), Some(4200.0));
    assert!(result
        .error()
        .unwrap()
        .starts_with("AI processing failed: Feature importance plot failed:"));
}

#[tokio::test]
async fn test_both_generators_fail() {
    let h = harness(
        FakePredictionService::returning(60.0),
        FakeGenerationBackend::always_error(GenerationError::Timeout(60)),
        FakeGenerationBackend::always_error(GenerationError::EmptyResponse),
    );

    let result = h.pipeline.run_pipeline(&scenario_input()).await;
    assert_eq!(
        result,
        PipelineResult::Degraded {
            predicted_time_left_seconds: 60.0,
            error: "AI processing failed: Explanation generation failed: Request timeout after 60 seconds; \
Feature importance plot failed: Generation backend returned empty response"
                .to_string(),
        }
    );
}

// ============================================================================
// Determinism
// ============================================================================

#[tokio::test]
async fn test_identical_runs_are_byte_identical() {
    let h = harness(FakePredictionService::returning(9000.0), explanation_ok(), plot_ok());

    let first = serde_json::to_string(&h.pipeline.run_pipeline(&scenario_input()).await).unwrap();
    let second = serde_json::to_string(&h.pipeline.run_pipeline(&scenario_input()).await).unwrap();
    assert_eq!(first, second);

    let prompts = h.image.prompts();
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn test_custom_importance_reaches_visualizer() {
    let h = harness(FakePredictionService::returning(1.0), explanation_ok(), plot_ok());
    let pipeline = h.pipeline.with_importance(FeatureImportanceRequest::new(
        vec!["Screen Brightness".to_string(), "CPU Load".to_string()],
        vec![0.7, 0.3],
    ));

    pipeline.run_pipeline(&scenario_input()).await;
    let prompt = &h.image.prompts()[0];
    assert!(prompt.contains("Features: Screen Brightness, CPU Load"));
    assert!(prompt.contains("Importance Scores: 0.7, 0.3"));
}
