//! Core data models for the forecasting service

use crate::error::PredictError;
use crate::predictor::OutputRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category values the simulator produces for each categorical field
pub mod categories {
    pub const WEATHER: &[&str] = &["Clear", "Rain", "Fog"];
    pub const TRAFFIC_LEVEL: &[&str] = &["Low", "High"];
    pub const BIN_TYPE: &[&str] = &["Landfill", "Recycling"];
}

/// City domain served by one forecasting model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Traffic,
    Energy,
    Waste,
    Pollution,
    Emergency,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Traffic,
        Domain::Energy,
        Domain::Waste,
        Domain::Pollution,
        Domain::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Traffic => "traffic",
            Domain::Energy => "energy",
            Domain::Waste => "waste",
            Domain::Pollution => "pollution",
            Domain::Emergency => "emergency",
        }
    }

    /// Registry key of the model serving this domain
    pub fn model_name(&self) -> &'static str {
        match self {
            Domain::Traffic => "traffic_model",
            Domain::Energy => "energy_model",
            Domain::Waste => "waste_model",
            Domain::Pollution => "pollution_model",
            Domain::Emergency => "emergency_model",
        }
    }

    /// Name of the single field in a successful response
    pub fn response_field(&self) -> &'static str {
        match self {
            Domain::Traffic => "predicted_vehicle_count_in_1_hr",
            Domain::Energy => "predicted_grid_load_mw_in_24_hrs",
            Domain::Waste => "predicted_fill_level_in_1_day",
            Domain::Pollution => "predicted_aqi_in_1_hr",
            Domain::Emergency => "predicted_incident_probability_in_1_hr",
        }
    }

    pub fn output_rule(&self) -> OutputRule {
        match self {
            Domain::Traffic | Domain::Energy | Domain::Pollution => OutputRule::Regression,
            Domain::Waste => OutputRule::BoundedRegression { min: 0.0, max: 100.0 },
            Domain::Emergency => OutputRule::PositiveClassProbability,
        }
    }

    /// Column layout produced by the training ETL: numeric columns in record
    /// order, then one indicator per category with the first (sorted)
    /// category dropped.
    pub fn reference_schema(&self) -> &'static [&'static str] {
        match self {
            Domain::Traffic => &[
                "hour",
                "day_of_week",
                "vehicle_count",
                "weather_Fog",
                "weather_Rain",
            ],
            Domain::Energy => &["hour", "day_of_week", "temperature", "grid_load_mw"],
            Domain::Waste => &[
                "fill_level_percent",
                "days_since_collection",
                "bin_type_Recycling",
            ],
            Domain::Pollution => &["hour", "aqi", "traffic_level_Low"],
            Domain::Emergency => &[
                "hour",
                "day_of_week",
                "weather_Fog",
                "weather_Rain",
                "traffic_level_Low",
            ],
        }
    }

    /// Look up the domain served by a registry key
    pub fn from_model_name(name: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.model_name() == name)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown domain '{}'", s))
    }
}

/// A single scalar field of a raw input record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Int(i64),
    Float(f64),
    Category(&'a str),
}

/// A per-domain input record with a fixed, declared field set
pub trait RawRecord {
    const DOMAIN: Domain;

    /// Fields in declaration order
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)>;

    /// Boundary checks beyond what deserialization enforces
    fn validate(&self) -> Result<(), PredictError> {
        for (name, value) in self.fields() {
            match value {
                FieldValue::Float(v) if !v.is_finite() => {
                    return Err(PredictError::InvalidInput(format!(
                        "field '{}' must be a finite number",
                        name
                    )));
                }
                FieldValue::Category(c) if c.trim().is_empty() => {
                    return Err(PredictError::InvalidInput(format!(
                        "field '{}' must not be empty",
                        name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficInput {
    pub hour: i64,
    pub day_of_week: i64,
    /// "Clear", "Rain" or "Fog"
    pub weather: String,
    pub vehicle_count: i64,
}

impl RawRecord for TrafficInput {
    const DOMAIN: Domain = Domain::Traffic;

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("hour", FieldValue::Int(self.hour)),
            ("day_of_week", FieldValue::Int(self.day_of_week)),
            ("weather", FieldValue::Category(&self.weather)),
            ("vehicle_count", FieldValue::Int(self.vehicle_count)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyInput {
    pub hour: i64,
    pub day_of_week: i64,
    pub temperature: f64,
    pub grid_load_mw: i64,
}

impl RawRecord for EnergyInput {
    const DOMAIN: Domain = Domain::Energy;

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("hour", FieldValue::Int(self.hour)),
            ("day_of_week", FieldValue::Int(self.day_of_week)),
            ("temperature", FieldValue::Float(self.temperature)),
            ("grid_load_mw", FieldValue::Int(self.grid_load_mw)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteInput {
    /// "Landfill" or "Recycling"
    pub bin_type: String,
    pub fill_level_percent: i64,
    pub days_since_collection: i64,
}

impl RawRecord for WasteInput {
    const DOMAIN: Domain = Domain::Waste;

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("bin_type", FieldValue::Category(&self.bin_type)),
            ("fill_level_percent", FieldValue::Int(self.fill_level_percent)),
            ("days_since_collection", FieldValue::Int(self.days_since_collection)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionInput {
    pub hour: i64,
    /// "Low" or "High"
    pub traffic_level: String,
    pub aqi: i64,
}

impl RawRecord for PollutionInput {
    const DOMAIN: Domain = Domain::Pollution;

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("hour", FieldValue::Int(self.hour)),
            ("traffic_level", FieldValue::Category(&self.traffic_level)),
            ("aqi", FieldValue::Int(self.aqi)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyInput {
    pub hour: i64,
    pub day_of_week: i64,
    pub weather: String,
    pub traffic_level: String,
}

impl RawRecord for EmergencyInput {
    const DOMAIN: Domain = Domain::Emergency;

    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("hour", FieldValue::Int(self.hour)),
            ("day_of_week", FieldValue::Int(self.day_of_week)),
            ("weather", FieldValue::Category(&self.weather)),
            ("traffic_level", FieldValue::Category(&self.traffic_level)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trips_through_str() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
            assert_eq!(Domain::from_model_name(domain.model_name()), Some(domain));
        }
        assert!("parking".parse::<Domain>().is_err());
    }

    #[test]
    fn test_missing_field_is_rejected_by_deserialization() {
        let err = serde_json::from_str::<TrafficInput>(r#"{"hour": 8, "weather": "Rain"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_type_mismatch_is_rejected_by_deserialization() {
        let err = serde_json::from_str::<WasteInput>(
            r#"{"bin_type": 3, "fill_level_percent": 10, "days_since_collection": 1}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_float() {
        let input = EnergyInput {
            hour: 1,
            day_of_week: 2,
            temperature: f64::NAN,
            grid_load_mw: 300,
        };
        assert!(matches!(input.validate(), Err(PredictError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_blank_category() {
        let input = PollutionInput {
            hour: 1,
            traffic_level: "  ".to_string(),
            aqi: 50,
        };
        assert!(matches!(input.validate(), Err(PredictError::InvalidInput(_))));
    }

    #[test]
    fn test_unseen_category_passes_validation() {
        let input = TrafficInput {
            hour: 8,
            day_of_week: 0,
            weather: "Snow".to_string(),
            vehicle_count: 150,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_reference_schema_covers_numeric_fields() {
        let input = EmergencyInput {
            hour: 1,
            day_of_week: 1,
            weather: "Fog".into(),
            traffic_level: "Low".into(),
        };
        let schema = Domain::Emergency.reference_schema();
        for (name, value) in input.fields() {
            if let FieldValue::Int(_) = value {
                assert!(schema.contains(&name));
            }
        }
    }
}
