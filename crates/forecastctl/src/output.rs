//! Output formatting - plain ASCII terminal output

use forecast_common::{DataUri, FormattedDuration, ModelMetric, PipelineResult};
use owo_colors::OwoColorize;
use std::fmt::Write;

/// Human-readable rendering of a pipeline result.
pub fn render_result(result: &PipelineResult) -> String {
    let mut out = String::new();

    if let Some(seconds) = result.predicted_time_left_seconds() {
        match FormattedDuration::from_seconds(seconds) {
            Ok(duration) => {
                let _ = writeln!(
                    out,
                    "[FORECAST] Estimated time left: {}",
                    duration.to_string().bright_green()
                );
            }
            Err(e) => {
                let _ = writeln!(out, "[FORECAST] {}", e.yellow());
            }
        }
    }

    if let Some(explanation) = result.explanation() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[EXPLANATION]");
        let _ = writeln!(out, "  {}", explanation);
    }

    if let Some(uri) = result.feature_importance_plot_uri() {
        let _ = writeln!(out);
        match DataUri::parse(uri) {
            Ok(plot) => {
                let _ = writeln!(
                    out,
                    "[FEATURE IMPORTANCE] {} ({} bytes, URI {} chars)",
                    plot.mime_type.cyan(),
                    plot.data.len(),
                    uri.len()
                );
            }
            Err(e) => {
                let _ = writeln!(out, "[FEATURE IMPORTANCE] {}", e.yellow());
            }
        }
    }

    if let Some(error) = result.error() {
        if result.predicted_time_left_seconds().is_some() {
            let _ = writeln!(out);
            let _ = writeln!(out, "[WARNING] {}", error.yellow());
        } else {
            let _ = writeln!(out, "[ERROR] {}", error.bright_red());
        }
    }

    out
}

/// Metrics table, one block per metric.
pub fn render_metrics(metrics: &[ModelMetric]) -> String {
    let width = metrics.iter().map(|m| m.name.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(out, "[MODEL METRICS]");
    for metric in metrics {
        let _ = writeln!(
            out,
            "  {:<width$}  {}",
            metric.name,
            metric.value.bright_green(),
            width = width
        );
        let _ = writeln!(out, "  {:<width$}  {}", "", metric.description.dimmed(), width = width);
    }
    out
}

/// Decoded plot bytes, if the result carries a valid data URI.
pub fn plot_bytes(result: &PipelineResult) -> Option<Vec<u8>> {
    result
        .feature_importance_plot_uri()
        .and_then(|uri| DataUri::parse(uri).ok())
        .map(|plot| plot.data)
}
