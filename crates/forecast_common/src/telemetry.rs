//! Telemetry record and validator.
//!
//! Raw input arrives as a string mapping (a decoded form submission, or a JSON
//! object run through [`raw_input_from_json`]). [`validate_telemetry`] coerces
//! and range-checks every field and either returns a complete record or the
//! full set of field-tagged violations.

use crate::error::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Untyped field name -> raw value mapping.
pub type RawInput = HashMap<String, String>;

pub const FIELD_STATE: &str = "state";
pub const FIELD_CAPACITY_PERCENTAGE: &str = "capacityPercentage";
pub const FIELD_DESIGN_CAPACITY_MAH: &str = "designCapacityMah";
pub const FIELD_DURATION_SECONDS: &str = "durationSeconds";
pub const FIELD_CURRENT_ENERGY_MWH: &str = "currentEnergyMwh";
pub const FIELD_FULL_CHARGE_CAPACITY_MAH: &str = "fullChargeCapacityMah";

/// Input fields in declaration order.
pub const TELEMETRY_FIELDS: [&str; 6] = [
    FIELD_STATE,
    FIELD_CAPACITY_PERCENTAGE,
    FIELD_DESIGN_CAPACITY_MAH,
    FIELD_DURATION_SECONDS,
    FIELD_CURRENT_ENERGY_MWH,
    FIELD_FULL_CHARGE_CAPACITY_MAH,
];

/// Largest integer a JSON number carries exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Power state of the laptop when the telemetry was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatteryState {
    Active,
    Idle,
    Sleep,
    #[serde(rename = "Connected standby", alias = "ConnectedStandby")]
    ConnectedStandby,
}

impl BatteryState {
    pub const ALL: [BatteryState; 4] = [
        BatteryState::Active,
        BatteryState::Idle,
        BatteryState::Sleep,
        BatteryState::ConnectedStandby,
    ];

    /// Label used on the wire and in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            BatteryState::Active => "Active",
            BatteryState::Idle => "Idle",
            BatteryState::Sleep => "Sleep",
            BatteryState::ConnectedStandby => "Connected standby",
        }
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BatteryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value == "ConnectedStandby" {
            return Ok(BatteryState::ConnectedStandby);
        }
        BatteryState::ALL
            .into_iter()
            .find(|state| state.label() == value)
            .ok_or_else(|| {
                let expected = BatteryState::ALL
                    .iter()
                    .map(|state| format!("'{}'", state.label()))
                    .collect::<Vec<_>>()
                    .join(" | ");
                format!("Invalid enum value. Expected {}, received '{}'", expected, value)
            })
    }
}

/// Validated telemetry. Also the JSON body sent to the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub state: BatteryState,
    pub capacity_percentage: f64,
    pub design_capacity_mah: f64,
    pub duration_seconds: u64,
    pub current_energy_mwh: f64,
    pub full_charge_capacity_mah: f64,
}

/// Validate raw input into a [`TelemetryRecord`].
///
/// Every field is checked; the error lists all violations, never a partial record.
pub fn validate_telemetry(raw: &RawInput) -> Result<TelemetryRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let state = match required(raw, FIELD_STATE) {
        Some(value) => match value.parse::<BatteryState>() {
            Ok(state) => Some(state),
            Err(msg) => {
                errors.add(FIELD_STATE, msg);
                None
            }
        },
        None => {
            errors.add(FIELD_STATE, "Required");
            None
        }
    };

    let capacity_percentage = number_field(raw, FIELD_CAPACITY_PERCENTAGE, &mut errors)
        .filter(|&v| at_least(v, 0.0, FIELD_CAPACITY_PERCENTAGE, &mut errors))
        .filter(|&v| at_most(v, 100.0, FIELD_CAPACITY_PERCENTAGE, &mut errors));

    let design_capacity_mah = number_field(raw, FIELD_DESIGN_CAPACITY_MAH, &mut errors)
        .filter(|&v| positive(v, FIELD_DESIGN_CAPACITY_MAH, &mut errors));

    let duration_seconds = duration_field(raw, &mut errors);

    let current_energy_mwh = number_field(raw, FIELD_CURRENT_ENERGY_MWH, &mut errors)
        .filter(|&v| at_least(v, 0.0, FIELD_CURRENT_ENERGY_MWH, &mut errors));

    let full_charge_capacity_mah = number_field(raw, FIELD_FULL_CHARGE_CAPACITY_MAH, &mut errors)
        .filter(|&v| positive(v, FIELD_FULL_CHARGE_CAPACITY_MAH, &mut errors));

    match (
        state,
        capacity_percentage,
        design_capacity_mah,
        duration_seconds,
        current_energy_mwh,
        full_charge_capacity_mah,
    ) {
        (Some(state), Some(cap), Some(design), Some(duration), Some(energy), Some(full))
            if errors.is_empty() =>
        {
            Ok(TelemetryRecord {
                state,
                capacity_percentage: cap,
                design_capacity_mah: design,
                duration_seconds: duration,
                current_energy_mwh: energy,
                full_charge_capacity_mah: full,
            })
        }
        _ => Err(errors),
    }
}

/// Flatten a JSON object into [`RawInput`] so JSON bodies validate like forms.
///
/// Returns `None` when `value` is not an object. `null` members are dropped.
pub fn raw_input_from_json(value: &serde_json::Value) -> Option<RawInput> {
    let object = value.as_object()?;
    let raw = object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect();
    Some(raw)
}

fn required<'a>(raw: &'a RawInput, field: &str) -> Option<&'a str> {
    raw.get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn number_field(raw: &RawInput, field: &'static str, errors: &mut ValidationErrors) -> Option<f64> {
    let Some(value) = required(raw, field) else {
        errors.add(field, "Required");
        return None;
    };
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            errors.add(field, format!("Expected number, received \"{}\"", value));
            None
        }
    }
}

fn duration_field(raw: &RawInput, errors: &mut ValidationErrors) -> Option<u64> {
    let value = number_field(raw, FIELD_DURATION_SECONDS, errors)?;
    let mut ok = true;
    if value.fract() != 0.0 {
        errors.add(
            FIELD_DURATION_SECONDS,
            format!("Expected integer, received {}", value),
        );
        ok = false;
    }
    ok &= at_least(value, 1.0, FIELD_DURATION_SECONDS, errors);
    ok &= at_most(value, MAX_SAFE_INTEGER, FIELD_DURATION_SECONDS, errors);
    ok.then_some(value as u64)
}

fn at_least(value: f64, min: f64, field: &'static str, errors: &mut ValidationErrors) -> bool {
    if value < min {
        errors.add(field, format!("Number must be greater than or equal to {}", min));
        return false;
    }
    true
}

fn at_most(value: f64, max: f64, field: &'static str, errors: &mut ValidationErrors) -> bool {
    if value > max {
        errors.add(field, format!("Number must be less than or equal to {}", max));
        return false;
    }
    true
}

fn positive(value: f64, field: &'static str, errors: &mut ValidationErrors) -> bool {
    if value <= 0.0 {
        errors.add(field, "Number must be greater than 0");
        return false;
    }
    true
}
