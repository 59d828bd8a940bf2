//! Prediction service
//!
//! One operation per city domain. Every call follows the same protocol:
//! validate the record, look up the domain's model, encode features against
//! its schema, run the model and post-process the output. Failures never
//! escape as errors; they are folded into the `{"error": ...}` envelope that
//! clients already expect from a successful response.

use crate::error::PredictError;
use crate::models::{
    Domain, EmergencyInput, EnergyInput, PollutionInput, RawRecord, TrafficInput, WasteInput,
};
use crate::observability::{outcome, ForecastMetrics, StructuredLogger};
use crate::predictor::{FeatureEncoder, OutputFormatter, OutputRule};
use crate::registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Response body of a prediction route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Error { error: String },
    Forecast(BTreeMap<String, f64>),
}

impl PredictionResponse {
    pub fn forecast(domain: Domain, value: f64) -> Self {
        let mut body = BTreeMap::new();
        body.insert(domain.response_field().to_string(), value);
        PredictionResponse::Forecast(body)
    }

    pub fn error(message: impl Into<String>) -> Self {
        PredictionResponse::Error {
            error: message.into(),
        }
    }

    /// Envelope for a request-time failure
    pub fn from_error(err: &PredictError) -> Self {
        let message = match err {
            PredictError::ModelNotLoaded(_) => err.to_string(),
            PredictError::InvalidInput(detail) => format!("Invalid input: {}", detail),
            other => format!("Prediction failed: {}", other),
        };
        Self::error(message)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            PredictionResponse::Forecast(body) => body.values().next().copied(),
            PredictionResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PredictionResponse::Error { error } => Some(error),
            PredictionResponse::Forecast(_) => None,
        }
    }
}

/// Serves predictions from a read-only model registry
#[derive(Clone)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    formatter: OutputFormatter,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            formatter: OutputFormatter::new(),
            metrics: ForecastMetrics::new(),
            logger: StructuredLogger::new("city-forecast"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn predict_traffic(&self, input: &TrafficInput) -> PredictionResponse {
        self.predict(input)
    }

    pub fn predict_energy(&self, input: &EnergyInput) -> PredictionResponse {
        self.predict(input)
    }

    pub fn predict_waste(&self, input: &WasteInput) -> PredictionResponse {
        self.predict(input)
    }

    pub fn predict_pollution(&self, input: &PollutionInput) -> PredictionResponse {
        self.predict(input)
    }

    pub fn predict_emergency(&self, input: &EmergencyInput) -> PredictionResponse {
        self.predict(input)
    }

    /// Run the protocol for any domain record and wrap the outcome
    pub fn predict<R: RawRecord>(&self, input: &R) -> PredictionResponse {
        let domain = R::DOMAIN;
        let start = Instant::now();
        let result = self.try_predict(input);
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(value) => {
                self.metrics
                    .observe_prediction(domain.as_str(), outcome::SUCCESS, elapsed);
                PredictionResponse::forecast(domain, value)
            }
            Err(err) => {
                self.metrics
                    .observe_prediction(domain.as_str(), outcome_label(&err), elapsed);
                if !matches!(err, PredictError::ModelNotLoaded(_)) {
                    self.logger.log_prediction_failed(
                        domain.as_str(),
                        domain.model_name(),
                        &err.to_string(),
                    );
                }
                PredictionResponse::from_error(&err)
            }
        }
    }

    /// Envelope for a request body that could not be parsed into a record
    pub fn reject_input(&self, domain: Domain, detail: &str) -> PredictionResponse {
        self.metrics
            .observe_prediction(domain.as_str(), outcome::INVALID_INPUT, 0.0);
        PredictionResponse::from_error(&PredictError::InvalidInput(detail.to_string()))
    }

    /// Run the protocol without wrapping failures
    pub fn try_predict<R: RawRecord>(&self, input: &R) -> Result<f64, PredictError> {
        let domain = R::DOMAIN;
        input.validate()?;

        let model = self.registry.get(domain.model_name())?;
        let encoder = FeatureEncoder::for_model(domain.model_name(), model.schema())?;
        let row = encoder.encode(input);
        let predictor = model.predictor();

        match domain.output_rule() {
            OutputRule::PositiveClassProbability => {
                if let Some(classes) = predictor.classes() {
                    if classes != [0, 1] {
                        return Err(PredictError::NotBinaryClassifier(format!("{:?}", classes)));
                    }
                }
                let probabilities = predictor.predict_proba(&row)?;
                self.formatter.format_positive_class(&probabilities)
            }
            rule => {
                let raw = predictor.predict(&row)?;
                self.formatter.format_point(rule, raw)
            }
        }
    }
}

fn outcome_label(err: &PredictError) -> &'static str {
    match err {
        PredictError::ModelNotLoaded(_) => outcome::MODEL_NOT_LOADED,
        PredictError::InvalidInput(_) => outcome::INVALID_INPUT,
        _ => outcome::FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::Predictor;
    use crate::schema::ModelSchema;
    use crate::test_support::FixedPredictor;

    fn schema(domain: Domain) -> ModelSchema {
        ModelSchema::new(domain.reference_schema().iter().copied())
    }

    fn service_with(name: &str, predictor: Arc<dyn Predictor>, schema: ModelSchema) -> PredictionService {
        let registry = ModelRegistry::builder().register(name, predictor, schema).build();
        PredictionService::new(Arc::new(registry))
    }

    fn traffic() -> TrafficInput {
        TrafficInput {
            hour: 8,
            day_of_week: 0,
            weather: "Rain".into(),
            vehicle_count: 150,
        }
    }

    fn waste() -> WasteInput {
        WasteInput {
            bin_type: "Recycling".into(),
            fill_level_percent: 150,
            days_since_collection: 2,
        }
    }

    fn emergency() -> EmergencyInput {
        EmergencyInput {
            hour: 22,
            day_of_week: 5,
            weather: "Fog".into(),
            traffic_level: "High".into(),
        }
    }

    #[test]
    fn test_traffic_prediction_is_rounded() {
        let predictor = Arc::new(FixedPredictor::regressor(171.3456));
        let service = service_with("traffic_model", predictor.clone(), schema(Domain::Traffic));

        let response = service.predict_traffic(&traffic());

        assert_eq!(response.value(), Some(171.35));
        assert_eq!(predictor.seen_row(), Some(vec![8.0, 0.0, 150.0, 0.0, 1.0]));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["predicted_vehicle_count_in_1_hr"], 171.35);
    }

    #[test]
    fn test_waste_prediction_is_clamped() {
        let service = service_with(
            "waste_model",
            Arc::new(FixedPredictor::regressor(140.0)),
            schema(Domain::Waste),
        );
        let response = service.predict_waste(&waste());
        assert_eq!(response.value(), Some(100.0));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["predicted_fill_level_in_1_day"], 100.0);
    }

    #[test]
    fn test_emergency_returns_positive_class() {
        let predictor = Arc::new(FixedPredictor::classifier(vec![0.712_34, 0.287_66]));
        let service = service_with("emergency_model", predictor.clone(), schema(Domain::Emergency));

        let response = service.predict_emergency(&emergency());

        assert_eq!(response.value(), Some(0.2877));
        assert_eq!(predictor.seen_row(), Some(vec![22.0, 5.0, 1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_emergency_rejects_non_binary_classes() {
        let predictor = FixedPredictor {
            classes: Some(vec![1, 0]),
            ..FixedPredictor::classifier(vec![0.4, 0.6])
        };
        let service = service_with("emergency_model", Arc::new(predictor), schema(Domain::Emergency));

        let response = service.predict_emergency(&emergency());
        assert!(response.error_message().unwrap().starts_with("Prediction failed:"));
    }

    #[test]
    fn test_emergency_rejects_three_class_output() {
        let predictor = FixedPredictor {
            classes: None,
            ..FixedPredictor::classifier(vec![0.2, 0.3, 0.5])
        };
        let service = service_with("emergency_model", Arc::new(predictor), schema(Domain::Emergency));
        assert!(service.predict_emergency(&emergency()).error_message().is_some());
    }

    #[test]
    fn test_unknown_model_returns_soft_error() {
        let service = PredictionService::new(Arc::new(ModelRegistry::default()));

        for (response, model) in [
            (service.predict_traffic(&traffic()), "traffic_model"),
            (service.predict_waste(&waste()), "waste_model"),
            (service.predict_emergency(&emergency()), "emergency_model"),
        ] {
            assert_eq!(response, PredictionResponse::error(format!("{} not loaded", model)));
        }
    }

    #[test]
    fn test_empty_schema_always_fails() {
        let predictor = Arc::new(FixedPredictor::regressor(12.0));
        let service = service_with("pollution_model", predictor.clone(), ModelSchema::empty());
        let input = PollutionInput {
            hour: 7,
            traffic_level: "High".into(),
            aqi: 80,
        };

        for _ in 0..3 {
            assert_eq!(
                service.try_predict(&input),
                Err(PredictError::FeatureSchemaUnavailable("pollution_model".into()))
            );
            let response = service.predict_pollution(&input);
            assert_eq!(
                response.error_message(),
                Some("Prediction failed: feature schema for model 'pollution_model' is unavailable")
            );
        }
        assert_eq!(predictor.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_input_is_soft() {
        let service = service_with(
            "energy_model",
            Arc::new(FixedPredictor::regressor(300.0)),
            schema(Domain::Energy),
        );
        let response = service.predict_energy(&EnergyInput {
            hour: 1,
            day_of_week: 1,
            temperature: f64::INFINITY,
            grid_load_mw: 400,
        });
        assert!(response.error_message().unwrap().starts_with("Invalid input:"));

        let rejected = service.reject_input(Domain::Energy, "missing field `hour`");
        assert_eq!(rejected.error_message(), Some("Invalid input: missing field `hour`"));
    }

    #[test]
    fn test_non_finite_prediction_is_soft() {
        let service = service_with(
            "energy_model",
            Arc::new(FixedPredictor::regressor(f32::NAN)),
            schema(Domain::Energy),
        );
        let response = service.predict_energy(&EnergyInput {
            hour: 1,
            day_of_week: 1,
            temperature: 12.0,
            grid_load_mw: 400,
        });
        assert_eq!(
            response.error_message(),
            Some("Prediction failed: model returned a non-finite value")
        );
    }

    #[test]
    fn test_response_deserializes_both_shapes() {
        let ok: PredictionResponse =
            serde_json::from_str(r#"{"predicted_aqi_in_1_hr": 61.5}"#).unwrap();
        assert_eq!(ok.value(), Some(61.5));
        let err: PredictionResponse =
            serde_json::from_str(r#"{"error": "pollution_model not loaded"}"#).unwrap();
        assert_eq!(err.error_message(), Some("pollution_model not loaded"));
    }
}
