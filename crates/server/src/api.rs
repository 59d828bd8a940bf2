//! HTTP API: prediction routes, service status, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use forecast_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{EmergencyInput, EnergyInput, PollutionInput, RawRecord, TrafficInput, WasteInput},
    service::{PredictionResponse, PredictionService},
};
use prometheus::{Encoder, TextEncoder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub const STATUS_MESSAGE: &str = "Smart City Forecasting API is running";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: PredictionService, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub models_loaded: Vec<String>,
}

async fn root(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
        models_loaded: state.service.registry().model_names(),
    })
}

/// Shared handler for every `/predict/{domain}` route.
///
/// Always answers 200; failures, including unparseable bodies, travel in the
/// `error` field.
async fn predict<R>(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<R>, JsonRejection>,
) -> Json<PredictionResponse>
where
    R: RawRecord + DeserializeOwned + Send + Sync + 'static,
{
    match payload {
        Ok(Json(input)) => Json(state.service.predict(&input)),
        Err(rejection) => Json(
            state
                .service
                .reject_input(R::DOMAIN, &rejection.body_text()),
        ),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Missing models still serve soft errors
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict/traffic", post(predict::<TrafficInput>))
        .route("/predict/energy", post(predict::<EnergyInput>))
        .route("/predict/waste", post(predict::<WasteInput>))
        .route("/predict/pollution", post(predict::<PollutionInput>))
        .route("/predict/emergency", post(predict::<EmergencyInput>))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
