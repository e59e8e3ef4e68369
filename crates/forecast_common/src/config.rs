//! Configuration management.
//!
//! Loads settings from a TOML file or uses defaults, then applies environment
//! overrides. Every field has a default so partial files are fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/battery-forecaster/config.toml";

/// Working-directory config file, checked when the system one is absent
pub const LOCAL_CONFIG_PATH: &str = "forecast.toml";

/// Env var naming an explicit config file
pub const CONFIG_ENV: &str = "FORECAST_CONFIG";

/// Env override for the prediction service base address
pub const PREDICTION_URL_ENV: &str = "PREDICTION_API_URL";
pub const GENERATION_URL_ENV: &str = "FORECAST_GENERATION_URL";
pub const GENERATION_MODEL_ENV: &str = "FORECAST_GENERATION_MODEL";

/// Prediction service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Base address; `/predict` is appended
    #[serde(default = "default_prediction_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_prediction_timeout")]
    pub timeout_secs: u64,
}

fn default_prediction_endpoint() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_prediction_timeout() -> u64 {
    10
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_prediction_endpoint(),
            timeout_secs: default_prediction_timeout(),
        }
    }
}

/// Wire protocol spoken by the generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationApi {
    #[default]
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
}

/// Text-generation backend settings, shared by the explainer and the visualizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api: GenerationApi,

    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Bearer token, OpenAI-compatible servers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_generation_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api: GenerationApi::default(),
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            api_key: None,
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// Daemon settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Also serve the heuristic `POST /predict` reference service
    #[serde(default)]
    pub reference_predictor: bool,
}

fn default_bind_addr() -> String {
    "127.0.0.1:9002".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            reference_predictor: false,
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub prediction: PredictionConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl ForecastConfig {
    /// Load config from the standard locations or use defaults, then apply env overrides
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_else(|e| {
            warn!("Config not found, using defaults: {}", e);
            ForecastConfig::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load config from an explicit path; a missing or invalid file is an error
    pub fn load_explicit(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&path));
        }
        Self::load_from_path(Path::new(CONFIG_PATH))
            .or_else(|_| Self::load_from_path(Path::new(LOCAL_CONFIG_PATH)))
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: ForecastConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(PREDICTION_URL_ENV) {
            self.prediction.endpoint = url;
        }
        if let Some(url) = non_empty(GENERATION_URL_ENV) {
            self.generation.endpoint = url;
        }
        if let Some(model) = non_empty(GENERATION_MODEL_ENV) {
            self.generation.model = model;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
