//! Evaluation scores of the prediction model, as published alongside forecasts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetric {
    pub name: String,
    pub value: String,
    pub description: String,
}

const METRICS: [(&str, &str, &str); 4] = [
    (
        "R² Score (Model Fit)",
        "0.9998",
        "Indicates how well data fits the regression model (closer to 1 is better).",
    ),
    (
        "Mean Absolute Error (MAE)",
        "40.46 sec",
        "Average magnitude of errors in predictions (lower is better).",
    ),
    (
        "Root Mean Squared Error (RMSE)",
        "202.22 sec",
        "Standard deviation of prediction errors (lower is better, sensitive to outliers).",
    ),
    (
        "Avg. Cross-Validation MAE (5-fold)",
        "39.99 sec",
        "Average MAE from 5-fold cross-validation, indicating generalization.",
    ),
];

/// The fixed metrics table, in display order.
pub fn model_metrics() -> Vec<ModelMetric> {
    METRICS
        .iter()
        .map(|(name, value, description)| ModelMetric {
            name: name.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        })
        .collect()
}
