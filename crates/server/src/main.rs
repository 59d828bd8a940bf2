//! Forecast server - smart-city prediction API
//!
//! Loads every trained model from the model directory once at startup and
//! serves predictions over HTTP until interrupted.

use anyhow::{Context, Result};
use forecast_lib::{
    health::{components, HealthRegistry},
    observability::{ForecastMetrics, StructuredLogger},
    registry::ModelRegistry,
    service::PredictionService,
};
use forecast_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    let addr = config.socket_addr()?;

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVER_VERSION, &config.model_dir.display().to_string());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_REGISTRY).await;
    health_registry.register(components::ARTIFACTS).await;

    std::fs::create_dir_all(&config.model_dir).with_context(|| {
        format!("Failed to create model directory {}", config.model_dir.display())
    })?;

    let (registry, report) = ModelRegistry::load(&config.model_dir);
    logger.log_load_report(&report);
    ForecastMetrics::new().record_load(&report);
    health_registry.apply_load_report(&report).await;
    info!(
        models = ?registry.model_names(),
        degraded = ?registry.degraded_models(),
        "Model registry ready"
    );

    let service = PredictionService::new(Arc::new(registry)).with_logger(logger.clone());
    let app_state = Arc::new(api::AppState::new(service, health_registry.clone()));

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    api::serve(addr, app_state, shutdown).await?;
    info!("Shutting down");

    Ok(())
}
