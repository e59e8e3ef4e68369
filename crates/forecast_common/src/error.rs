//! Error types for the forecast pipeline.

use std::fmt;
use thiserror::Error;

/// Violations collected for a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub messages: Vec<String>,
}

/// Field-tagged validation failures, kept in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation for `field`, appending to any earlier ones.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|f| f.field == field) {
            Some(existing) => existing.messages.push(message),
            None => self.fields.push(FieldError {
                field,
                messages: vec![message],
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    /// Messages recorded for one field, if any.
    pub fn messages_for(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.messages.as_slice())
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.messages_for(field).is_some()
    }

    /// `"<field>: <m1>, <m2>; <field>: <m1>"`
    pub fn flatten(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid input. Please check the form fields. {}",
            self.flatten()
        )
    }
}

/// Pipeline error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Prediction service failed: {status} {reason} - {body}")]
    Service {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("{0}")]
    Format(String),

    #[error("Could not reach prediction service: {0}")]
    Transport(String),

    #[error("{0}")]
    AiProcessing(String),
}

impl ForecastError {
    /// Pipeline stage the error belongs to, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            ForecastError::Validation(_) => "validation",
            ForecastError::Service { .. }
            | ForecastError::Format(_)
            | ForecastError::Transport(_) => "prediction",
            ForecastError::AiProcessing(_) => "generation",
        }
    }

    /// Terminal errors end the pipeline without a prediction.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ForecastError::AiProcessing(_))
    }
}

/// Failures talking to a text-generation backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Generation backend returned empty response")]
    EmptyResponse,
}
