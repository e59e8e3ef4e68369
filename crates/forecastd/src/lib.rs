//! Forecast daemon library - exposes modules for testing.

pub mod reference_predictor;
pub mod routes;
pub mod server;
