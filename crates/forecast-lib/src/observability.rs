//! Observability infrastructure for the forecasting service
//!
//! Provides:
//! - Prometheus metrics (prediction latency and outcomes, loaded models)
//! - Structured JSON logging with tracing

use crate::registry::LoadReport;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    models_loaded: IntGauge,
    models_degraded: IntGauge,
    artifact_errors: IntCounter,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "city_forecast_prediction_latency_seconds",
                "Time spent encoding features and running the model",
                &["domain"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "city_forecast_predictions_total",
                "Prediction requests by domain and outcome",
                &["domain", "outcome"]
            )
            .expect("Failed to register predictions_total"),

            models_loaded: register_int_gauge!(
                "city_forecast_models_loaded",
                "Number of models registered at startup"
            )
            .expect("Failed to register models_loaded"),

            models_degraded: register_int_gauge!(
                "city_forecast_models_degraded",
                "Number of models registered without a feature schema"
            )
            .expect("Failed to register models_degraded"),

            artifact_errors: register_int_counter!(
                "city_forecast_artifact_errors_total",
                "Predictor artifacts that failed to load"
            )
            .expect("Failed to register artifact_errors_total"),
        }
    }
}

/// Prediction outcome label values
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const MODEL_NOT_LOADED: &str = "model_not_loaded";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const FAILED: &str = "failed";
}

/// Lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new)
    }

    pub fn observe_prediction(&self, domain: &str, outcome: &str, duration_secs: f64) {
        let inner = self.inner();
        inner
            .prediction_latency_seconds
            .with_label_values(&[domain])
            .observe(duration_secs);
        inner
            .predictions_total
            .with_label_values(&[domain, outcome])
            .inc();
    }

    pub fn predictions_count(&self, domain: &str, outcome: &str) -> u64 {
        self.inner()
            .predictions_total
            .with_label_values(&[domain, outcome])
            .get()
    }

    /// Publish the result of the startup load
    pub fn record_load(&self, report: &LoadReport) {
        let inner = self.inner();
        inner.models_loaded.set(report.total_registered() as i64);
        inner.models_degraded.set(report.degraded.len() as i64);
        inner.artifact_errors.inc_by(report.failures.len() as u64);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_startup(&self, version: &str, model_dir: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            model_dir = %model_dir,
            "Forecasting service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_stopped",
            service = %self.service_name,
            reason = %reason,
            "Forecasting service shutting down"
        );
    }

    /// Summarize a directory load: one event per model, then totals
    pub fn log_load_report(&self, report: &LoadReport) {
        for model in &report.loaded {
            info!(
                event = "model_loaded",
                service = %self.service_name,
                model = %model,
                "Model loaded"
            );
        }
        for model in &report.degraded {
            warn!(
                event = "model_degraded",
                service = %self.service_name,
                model = %model,
                "Model loaded without feature schema"
            );
        }
        for failure in &report.failures {
            warn!(
                event = "artifact_load_failed",
                service = %self.service_name,
                model = %failure.model,
                path = ?failure.path,
                reason = %failure.reason,
                "Model artifact skipped"
            );
        }
        if let Some(error) = &report.source_error {
            error!(
                event = "model_dir_unreadable",
                service = %self.service_name,
                error = %error,
                "Model directory could not be read"
            );
        }
        if report.total_registered() == 0 {
            warn!(
                event = "no_models_loaded",
                service = %self.service_name,
                "No models found in the model directory"
            );
        }
    }

    pub fn log_prediction_failed(&self, domain: &str, model: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service_name,
            domain = %domain,
            model = %model,
            error = %error,
            "Prediction failed"
        );
    }
}
