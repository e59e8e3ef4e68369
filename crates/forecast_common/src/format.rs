//! Human-readable remaining-time formatting.

use serde::Serialize;
use std::fmt;

/// Whole hours, minutes and seconds of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormattedDuration {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl FormattedDuration {
    /// Floor `total_seconds` into h/m/s. Negative or non-finite input is rejected.
    pub fn from_seconds(total_seconds: f64) -> Result<Self, String> {
        if !total_seconds.is_finite() || total_seconds < 0.0 {
            return Err("Invalid time value received from model.".to_string());
        }
        let total = total_seconds.floor() as u64;
        Ok(Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        })
    }
}

impl fmt::Display for FormattedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}
