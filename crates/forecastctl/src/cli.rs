//! CLI - Command-line argument parsing
//!
//! Telemetry values are taken as raw strings; checking them is the
//! validator's job, so the CLI reports the same messages as the daemon.

use clap::{Args, Parser, Subcommand};
use forecast_common::telemetry::{
    FIELD_CAPACITY_PERCENTAGE, FIELD_CURRENT_ENERGY_MWH, FIELD_DESIGN_CAPACITY_MAH,
    FIELD_DURATION_SECONDS, FIELD_FULL_CHARGE_CAPACITY_MAH, FIELD_STATE,
};
use forecast_common::RawInput;
use std::path::PathBuf;

/// Battery Forecaster CLI
#[derive(Parser, Debug)]
#[command(name = "forecastctl")]
#[command(about = "Battery Forecaster - laptop battery runtime forecasts", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $FORECAST_CONFIG and the default locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Forecast remaining battery time from one telemetry sample
    Predict(PredictArgs),

    /// Show the prediction model's evaluation metrics
    Metrics,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
pub struct PredictArgs {
    /// Power state: Active, Idle, Sleep or "Connected standby"
    #[arg(long)]
    pub state: Option<String>,

    /// Charge level, 0-100
    #[arg(long)]
    pub capacity_percentage: Option<String>,

    /// Design capacity in mAh
    #[arg(long)]
    pub design_capacity_mah: Option<String>,

    /// Length of the sample window in seconds
    #[arg(long)]
    pub duration_seconds: Option<String>,

    /// Energy currently stored, in mWh
    #[arg(long)]
    pub current_energy_mwh: Option<String>,

    /// Full-charge capacity in mAh
    #[arg(long)]
    pub full_charge_capacity_mah: Option<String>,

    /// Print the raw pipeline result as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the decoded feature-importance image to this file
    #[arg(long)]
    pub save_plot: Option<PathBuf>,
}

impl PredictArgs {
    /// Build the untyped input mapping. Flags that were not given are left out.
    pub fn to_raw_input(&self) -> RawInput {
        [
            (FIELD_STATE, &self.state),
            (FIELD_CAPACITY_PERCENTAGE, &self.capacity_percentage),
            (FIELD_DESIGN_CAPACITY_MAH, &self.design_capacity_mah),
            (FIELD_DURATION_SECONDS, &self.duration_seconds),
            (FIELD_CURRENT_ENERGY_MWH, &self.current_energy_mwh),
            (FIELD_FULL_CHARGE_CAPACITY_MAH, &self.full_charge_capacity_mah),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field.to_string(), v.clone())))
        .collect()
    }
}
