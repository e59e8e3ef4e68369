//! Forecast Control - command-line client for the Battery Forecaster
//!
//! Runs the forecast pipeline in-process against the configured prediction
//! service and generation backend.

use anyhow::{Context, Result};
use clap::Parser;
use forecast_common::{model_metrics, ForecastConfig, ForecastPipeline};
use forecastctl::cli::{Cli, Commands, PredictArgs};
use forecastctl::output;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ForecastConfig::load_explicit(path)?,
        None => ForecastConfig::load(),
    };

    match cli.command {
        Commands::Predict(args) => {
            let failed = predict(&config, &args).await?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Metrics => {
            print!("{}", output::render_metrics(&model_metrics()));
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Run one forecast. Returns true when the result carries an error.
async fn predict(config: &ForecastConfig, args: &PredictArgs) -> Result<bool> {
    let pipeline =
        ForecastPipeline::from_config(config).context("Failed to build forecast pipeline")?;
    let raw = args.to_raw_input();
    debug!("Running forecast with {} fields", raw.len());

    let result = pipeline.run_pipeline(&raw).await;

    if let Some(path) = &args.save_plot {
        if let Some(bytes) = output::plot_bytes(&result) {
            std::fs::write(path, bytes)
                .with_context(|| format!("Failed to write plot to {}", path.display()))?;
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", output::render_result(&result));
    }

    Ok(result.is_error())
}
