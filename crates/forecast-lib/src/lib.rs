//! Forecasting library for smart-city operations
//!
//! This crate provides the core functionality for:
//! - Domain request records and their feature encoding
//! - Loading trained model artifacts into a read-only registry
//! - Serving predictions with a uniform error envelope
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod registry;
pub mod schema;
pub mod service;

#[cfg(test)]
mod test_support;

pub use error::{ArtifactError, PredictError, RegistryError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use registry::{LoadReport, ModelRegistry};
pub use schema::ModelSchema;
pub use service::{PredictionResponse, PredictionService};
