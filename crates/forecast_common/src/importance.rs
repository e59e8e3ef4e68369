//! Feature-importance visualization.
//!
//! The visualizer asks a generation backend to render a horizontal bar chart
//! of feature weights and return it as a `data:<mime>;base64,<payload>` URI.
//! The request carries a locally rendered SVG chart of the same data as the
//! initial image payload.

use crate::error::ForecastError;
use crate::generation::GenerationBackend;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

const VISUALIZER_SYSTEM_PROMPT: &str = "You are an AI expert at visualizing data.";

const VISUALIZER_SCHEMA: &str =
    r#"{"plotDataUri": "string, format 'data:<mimetype>;base64,<encoded_data>'"}"#;

/// Hand-authored placeholder weights. Not derived from the prediction model.
const PLACEHOLDER_FEATURES: [(&str, f64); 6] = [
    ("Capacity Percentage", 0.34),
    ("Full Charge Capacity", 0.22),
    ("Current Energy", 0.18),
    ("Design Capacity", 0.11),
    ("Duration", 0.09),
    ("State", 0.06),
];

static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*);base64,([A-Za-z0-9+/=\s]+)$")
        .unwrap()
});

/// Ordered feature labels paired positionally with scores in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportanceRequest {
    feature_list: Vec<String>,
    importance_scores: Vec<f64>,
}

impl FeatureImportanceRequest {
    /// # Panics
    ///
    /// If the two sequences differ in length or a score is outside [0, 1].
    pub fn new(feature_list: Vec<String>, importance_scores: Vec<f64>) -> Self {
        assert_eq!(
            feature_list.len(),
            importance_scores.len(),
            "feature list and importance scores must have equal length"
        );
        assert!(
            importance_scores.iter().all(|s| (0.0..=1.0).contains(s)),
            "importance scores must lie in [0, 1]"
        );
        Self {
            feature_list,
            importance_scores,
        }
    }

    /// The fixed placeholder weights over telemetry-derived features.
    pub fn placeholder() -> Self {
        let (features, scores) = PLACEHOLDER_FEATURES
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .unzip();
        Self::new(features, scores)
    }

    pub fn feature_list(&self) -> &[String] {
        &self.feature_list
    }

    pub fn importance_scores(&self) -> &[f64] {
        &self.importance_scores
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.feature_list
            .iter()
            .map(String::as_str)
            .zip(self.importance_scores.iter().copied())
    }

    /// Horizontal bar chart as SVG: features on the y-axis, scores on the x-axis.
    pub fn render_svg(&self) -> String {
        const LABEL_WIDTH: u32 = 170;
        const BAR_WIDTH: f64 = 260.0;
        const ROW: u32 = 28;
        const TOP: u32 = 40;

        let height = TOP + ROW * self.feature_list.len() as u32 + 20;
        let mut svg = String::new();
        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="480" height="{height}"><rect width="100%" height="100%" fill="#fff"/><text x="240" y="24" text-anchor="middle" font-family="sans-serif" font-size="14">Feature Importance</text>"##
        );
        for (i, (name, score)) in self.pairs().enumerate() {
            let y = TOP + ROW * i as u32;
            let width = score * BAR_WIDTH;
            let _ = write!(
                svg,
                r##"<text x="{lx}" y="{ty}" text-anchor="end" font-family="sans-serif" font-size="12">{label}</text><rect x="{bx}" y="{y}" width="{width:.1}" height="18" fill="#4f7cac"/><text x="{vx:.1}" y="{ty}" font-family="sans-serif" font-size="11">{score:.2}</text>"##,
                lx = LABEL_WIDTH - 8,
                ty = y + 13,
                label = escape_xml(name),
                bx = LABEL_WIDTH,
                vx = LABEL_WIDTH as f64 + width + 4.0,
            );
        }
        svg.push_str("</svg>");
        svg
    }

    /// The SVG chart as a base64 data URI.
    pub fn placeholder_data_uri(&self) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(self.render_svg())
        )
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A parsed `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn parse(uri: &str) -> Result<Self, String> {
        let caps = DATA_URI_RE
            .captures(uri.trim())
            .ok_or_else(|| "expected 'data:<mimetype>;base64,<encoded_data>'".to_string())?;
        let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
        let data = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| format!("invalid base64 payload: {}", e))?;
        Ok(Self {
            mime_type: caps[1].to_string(),
            data,
        })
    }
}

/// Renders the feature-importance chart through a generation backend.
#[derive(Clone)]
pub struct FeatureImportanceVisualizer {
    backend: Arc<dyn GenerationBackend>,
}

impl FeatureImportanceVisualizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Returns the chart as a validated data URI.
    pub async fn visualize(&self, request: &FeatureImportanceRequest) -> Result<String, ForecastError> {
        let prompt = render_prompt(request);
        let output = self
            .backend
            .generate_json(VISUALIZER_SYSTEM_PROMPT, &prompt, VISUALIZER_SCHEMA)
            .await
            .map_err(|e| {
                ForecastError::AiProcessing(format!("Feature importance plot failed: {}", e))
            })?;

        let uri = output
            .get("plotDataUri")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .ok_or_else(|| {
                ForecastError::AiProcessing(
                    "Feature importance plot failed: model returned no plotDataUri".to_string(),
                )
            })?;

        let parsed = DataUri::parse(uri).map_err(|e| {
            ForecastError::AiProcessing(format!("Feature importance plot failed: {}", e))
        })?;
        debug!(mime = %parsed.mime_type, bytes = parsed.data.len(), "Feature importance plot ready");

        Ok(uri.to_string())
    }
}

fn render_prompt(request: &FeatureImportanceRequest) -> String {
    let payload = serde_json::json!({
        "featureList": request.feature_list(),
        "importanceScores": request.importance_scores(),
        "plotDataUri": request.placeholder_data_uri(),
    });
    format!(
        "Given a list of battery features and their importance scores, generate a visualization of the feature importances as a data URI.

Features: {}
Importance Scores: {}

The plot should be a bar chart with features on the y-axis and importance scores on the x-axis.
Return the plot as a data URI. It should include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'
Ensure the plot is visually appealing and easy to understand.

Request with the initial plot:
{}",
        request.feature_list().join(", "),
        request
            .importance_scores()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        payload,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::FakeGenerationBackend;

    #[test]
    fn test_placeholder_request() {
        let request = FeatureImportanceRequest::placeholder();
        assert_eq!(request.feature_list().len(), request.importance_scores().len());
        assert_eq!(request.feature_list()[0], "Capacity Percentage");
        assert!(request.importance_scores().iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_mismatched_lengths_panic() {
        FeatureImportanceRequest::new(vec!["a".into(), "b".into()], vec![0.5]);
    }

    #[test]
    #[should_panic(expected = "[0, 1]")]
    fn test_out_of_range_score_panics() {
        FeatureImportanceRequest::new(vec!["a".into()], vec![1.5]);
    }

    #[test]
    fn test_render_svg_escapes_labels() {
        let request = FeatureImportanceRequest::new(vec!["A & <B>".into()], vec![1.0]);
        let svg = request.render_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("A &amp; &lt;B&gt;"));
        assert!(svg.contains(r#"width="260.0""#));
    }

    #[test]
    fn test_placeholder_data_uri_round_trips() {
        let request = FeatureImportanceRequest::placeholder();
        let uri = request.placeholder_data_uri();
        let parsed = DataUri::parse(&uri).unwrap();
        assert_eq!(parsed.mime_type, "image/svg+xml");
        assert_eq!(String::from_utf8(parsed.data).unwrap(), request.render_svg());
    }

    #[test]
    fn test_data_uri_rejects_bad_input() {
        assert!(DataUri::parse("http://example.com/plot.png").is_err());
        assert!(DataUri::parse("data:image/png,rawbytes").is_err());
        assert!(DataUri::parse("data:image/png;base64,").is_err());
        assert!(DataUri::parse("data:image/png;base64,@@@").is_err());
        assert!(DataUri::parse("data:image/png;base64,AAA").is_err());
        assert!(DataUri::parse("data:image/png;base64,iVBORw0KGgo=").is_ok());
    }

    #[tokio::test]
    async fn test_visualize_returns_valid_uri() {
        let backend = Arc::new(FakeGenerationBackend::always_valid(
            serde_json::json!({"plotDataUri": "data:image/png;base64,iVBORw0KGgo="}),
        ));
        let visualizer = FeatureImportanceVisualizer::new(backend.clone());

        let uri = visualizer
            .visualize(&FeatureImportanceRequest::placeholder())
            .await
            .unwrap();
        assert_eq!(uri, "data:image/png;base64,iVBORw0KGgo=");

        let prompt = &backend.prompts()[0];
        assert!(prompt.contains("Features: Capacity Percentage, Full Charge Capacity"));
        assert!(prompt.contains("Importance Scores: 0.34, 0.22"));
        assert!(prompt.contains("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn test_visualize_rejects_invalid_uri() {
        for output in [
            serde_json::json!({"plotDataUri": "not a uri"}),
            serde_json::json!({"plot": "data:image/png;base64,iVBORw0KGgo="}),
        ] {
            let visualizer = FeatureImportanceVisualizer::new(Arc::new(
                FakeGenerationBackend::always_valid(output),
            ));
            let err = visualizer
                .visualize(&FeatureImportanceRequest::placeholder())
                .await
                .unwrap_err();
            assert!(matches!(err, ForecastError::AiProcessing(_)));
        }
    }

    #[tokio::test]
    async fn test_visualize_backend_failure() {
        let visualizer = FeatureImportanceVisualizer::new(Arc::new(
            FakeGenerationBackend::always_error(GenerationError::Http("HTTP 503".into())),
        ));
        let err = visualizer
            .visualize(&FeatureImportanceRequest::placeholder())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Feature importance plot failed: HTTP error: HTTP 503"
        );
    }
}
