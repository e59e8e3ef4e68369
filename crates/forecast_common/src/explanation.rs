//! Explanation input mapping and generation.

use crate::error::ForecastError;
use crate::generation::GenerationBackend;
use crate::prediction::PredictionResult;
use crate::telemetry::{BatteryState, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const EXPLANATION_SYSTEM_PROMPT: &str =
    "You are an AI assistant that explains battery life predictions for laptops.";

const EXPLANATION_SCHEMA: &str = r#"{"explanation": "string, a single well-written paragraph"}"#;

/// Input to the explanation prompt, derived from telemetry and the prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationInput {
    pub state: BatteryState,
    /// mAh
    pub capacity: f64,
    /// mAh
    pub design_capacity: f64,
    /// mWh
    pub drained: f64,
    pub duration_seconds: u64,
    /// mWh
    pub energy: f64,
    /// mAh
    pub full_charge_capacity: f64,
    pub predicted_time_left_seconds: f64,
}

impl ExplanationInput {
    /// Derive the prompt input. Pure; the only division is by the constant 100.
    pub fn derive(record: &TelemetryRecord, prediction: &PredictionResult) -> Self {
        // Drain figures are aliased to the current energy reading.
        let consumption_mwh = record.current_energy_mwh;

        Self {
            state: record.state,
            capacity: (record.capacity_percentage / 100.0) * record.full_charge_capacity_mah,
            design_capacity: record.design_capacity_mah,
            drained: consumption_mwh,
            duration_seconds: record.duration_seconds,
            energy: consumption_mwh,
            full_charge_capacity: record.full_charge_capacity_mah,
            predicted_time_left_seconds: prediction.predicted_time_left_seconds,
        }
    }

    /// Interpolate into the fixed explanation template.
    pub fn render_prompt(&self) -> String {
        format!(
            "Based on the following battery characteristics, provide a detailed explanation of the factors influencing the predicted battery life. \
Explain how each factor (state, capacity, design capacity, drained, duration seconds, energy, full charge capacity) contributes to the predicted time left.

State: {}
Capacity: {} mAh
Design Capacity: {} mAh
Drained: {} mWh
Duration Seconds: {} seconds
Energy: {} mWh
Full Charge Capacity: {} mAh
Predicted Time Left: {} seconds

Focus on making the explanation easy to understand for a non-technical user, highlighting the most important factors and their impact on battery life.
Make sure to mention specific numbers to justify the prediction.
Speak directly to the user in the second person, as if you were a consultant.
Be specific about what can be done to improve battery life.

Your output should be a single well-written paragraph.",
            self.state,
            self.capacity,
            self.design_capacity,
            self.drained,
            self.duration_seconds,
            self.energy,
            self.full_charge_capacity,
            self.predicted_time_left_seconds,
        )
    }
}

/// Produces a prose explanation through a generation backend.
#[derive(Clone)]
pub struct ExplanationGenerator {
    backend: Arc<dyn GenerationBackend>,
}

impl ExplanationGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Generate the explanation paragraph.
    ///
    /// Backend failures and empty or mistyped output become `AiProcessing`.
    pub async fn explain(&self, input: &ExplanationInput) -> Result<String, ForecastError> {
        let prompt = input.render_prompt();
        let output = self
            .backend
            .generate_json(EXPLANATION_SYSTEM_PROMPT, &prompt, EXPLANATION_SCHEMA)
            .await
            .map_err(|e| ForecastError::AiProcessing(format!("Explanation generation failed: {}", e)))?;

        let explanation = output
            .get("explanation")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();

        if explanation.is_empty() {
            return Err(ForecastError::AiProcessing(
                "Explanation generation failed: model returned no explanation".to_string(),
            ));
        }

        debug!("Explanation length: {}", explanation.len());
        Ok(explanation.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::FakeGenerationBackend;

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            state: BatteryState::Active,
            capacity_percentage: 80.0,
            design_capacity_mah: 42000.0,
            duration_seconds: 3600,
            current_energy_mwh: 30000.0,
            full_charge_capacity_mah: 40000.0,
        }
    }

    fn prediction(seconds: f64) -> PredictionResult {
        PredictionResult {
            predicted_time_left_seconds: seconds,
        }
    }

    #[test]
    fn test_derive_scenario() {
        let input = ExplanationInput::derive(&record(), &prediction(9000.0));
        assert_eq!(input.capacity, 32000.0);
        assert_eq!(input.design_capacity, 42000.0);
        assert_eq!(input.full_charge_capacity, 40000.0);
        assert_eq!(input.drained, 30000.0);
        assert_eq!(input.energy, 30000.0);
        assert_eq!(input.duration_seconds, 3600);
        assert_eq!(input.predicted_time_left_seconds, 9000.0);
        assert_eq!(input.state, BatteryState::Active);
    }

    #[test]
    fn test_capacity_formula_is_exact() {
        let percentages = [0.0, 0.5, 1.0, 12.34, 33.3, 50.0, 66.6, 99.99, 100.0];
        let capacities = [1.0, 2999.5, 4800.0, 40000.0, 57123.7];
        for &pct in &percentages {
            for &full in &capacities {
                let mut r = record();
                r.capacity_percentage = pct;
                r.full_charge_capacity_mah = full;
                let input = ExplanationInput::derive(&r, &prediction(1.0));
                assert_eq!(input.capacity, (pct / 100.0) * full);
            }
        }
    }

    #[test]
    fn test_prompt_interpolates_values() {
        let prompt = ExplanationInput::derive(&record(), &prediction(9000.0)).render_prompt();
        assert!(prompt.contains("State: Active"));
        assert!(prompt.contains("Capacity: 32000 mAh"));
        assert!(prompt.contains("Design Capacity: 42000 mAh"));
        assert!(prompt.contains("Duration Seconds: 3600 seconds"));
        assert!(prompt.contains("Predicted Time Left: 9000 seconds"));
        assert!(prompt.contains("second person"));
    }

    #[tokio::test]
    async fn test_explain_returns_trimmed_text() {
        let backend = Arc::new(FakeGenerationBackend::always_valid(
            serde_json::json!({"explanation": "  You have about 2.5 hours left.  "}),
        ));
        let generator = ExplanationGenerator::new(backend.clone());
        let input = ExplanationInput::derive(&record(), &prediction(9000.0));

        let text = generator.explain(&input).await.unwrap();
        assert_eq!(text, "You have about 2.5 hours left.");
        assert_eq!(backend.call_count(), 1);
        assert!(backend.prompts()[0].contains("Capacity: 32000 mAh"));
    }

    #[tokio::test]
    async fn test_explain_rejects_empty_or_missing() {
        let input = ExplanationInput::derive(&record(), &prediction(9000.0));
        for output in [
            serde_json::json!({"explanation": "   "}),
            serde_json::json!({"explanation": 42}),
            serde_json::json!({"text": "hello"}),
        ] {
            let generator =
                ExplanationGenerator::new(Arc::new(FakeGenerationBackend::always_valid(output)));
            let err = generator.explain(&input).await.unwrap_err();
            assert!(matches!(err, ForecastError::AiProcessing(_)));
        }
    }

    #[tokio::test]
    async fn test_explain_backend_failure() {
        let generator = ExplanationGenerator::new(Arc::new(FakeGenerationBackend::always_error(
            GenerationError::Timeout(60),
        )));
        let input = ExplanationInput::derive(&record(), &prediction(9000.0));
        let err = generator.explain(&input).await.unwrap_err();
        assert_eq!(
            err,
            ForecastError::AiProcessing(
                "Explanation generation failed: Request timeout after 60 seconds".to_string()
            )
        );
    }
}
