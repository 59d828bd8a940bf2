//! Feature encoding for ML inference
//!
//! Turns one raw input record into a numeric row aligned to the schema a
//! model was trained with. Categorical fields are expanded into indicator
//! columns named `{field}_{category}`, then the expansion is reindexed onto
//! the schema: absent columns read 0 and unknown columns are dropped.
//! Numeric fields pass through unscaled.

use crate::error::PredictError;
use crate::models::{FieldValue, RawRecord};
use crate::schema::ModelSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A numeric row aligned column-for-column with a model schema
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    columns: Arc<[String]>,
    values: Vec<f32>,
}

impl EncodedRow {
    /// Build a row from values already in schema order
    pub fn new(schema: &ModelSchema, values: Vec<f32>) -> Result<Self, PredictError> {
        if values.len() != schema.len() {
            return Err(PredictError::FeatureCountMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            columns: schema.shared_columns(),
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column, if the schema has it
    pub fn get(&self, column: &str) -> Option<f32> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

/// Encodes raw records against one model's schema
pub struct FeatureEncoder<'a> {
    model_name: &'a str,
    schema: &'a ModelSchema,
}

impl<'a> FeatureEncoder<'a> {
    /// Fails with `FeatureSchemaUnavailable` when the schema is empty, since an
    /// empty schema can never align with any input.
    pub fn for_model(model_name: &'a str, schema: &'a ModelSchema) -> Result<Self, PredictError> {
        if schema.is_empty() {
            return Err(PredictError::FeatureSchemaUnavailable(model_name.to_string()));
        }
        Ok(Self { model_name, schema })
    }

    pub fn encode<R: RawRecord + ?Sized>(&self, record: &R) -> EncodedRow {
        let expanded = expand(record);

        for (field, value) in record.fields() {
            if let FieldValue::Category(category) = value {
                let column = indicator_column(field, category);
                if self.schema.position(&column).is_none() {
                    // Baseline category dropped at training time, or a value
                    // the model never saw: every indicator reads 0.
                    debug!(
                        model = %self.model_name,
                        field = field,
                        category = %category,
                        "Category has no indicator column in schema"
                    );
                }
            }
        }

        let values = self
            .schema
            .columns()
            .iter()
            .map(|column| expanded.get(column.as_str()).copied().unwrap_or(0.0))
            .collect();

        EncodedRow {
            columns: self.schema.shared_columns(),
            values,
        }
    }
}

/// Name of the indicator column for one category of a field
pub fn indicator_column(field: &str, category: &str) -> String {
    format!("{}_{}", field, category)
}

fn expand<R: RawRecord + ?Sized>(record: &R) -> HashMap<String, f32> {
    let mut expanded = HashMap::new();
    for (field, value) in record.fields() {
        match value {
            FieldValue::Int(v) => {
                expanded.insert(field.to_string(), v as f32);
            }
            FieldValue::Float(v) => {
                expanded.insert(field.to_string(), v as f32);
            }
            FieldValue::Category(category) => {
                expanded.insert(indicator_column(field, category), 1.0);
            }
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Domain, EmergencyInput, EnergyInput, TrafficInput, WasteInput};
    use proptest::prelude::*;

    fn traffic_schema() -> ModelSchema {
        ModelSchema::new(["hour", "day_of_week", "vehicle_count", "weather_Fog", "weather_Rain"])
    }

    fn traffic(weather: &str) -> TrafficInput {
        TrafficInput {
            hour: 8,
            day_of_week: 0,
            weather: weather.to_string(),
            vehicle_count: 150,
        }
    }

    #[test]
    fn test_rainy_morning_traffic() {
        let schema = traffic_schema();
        let encoder = FeatureEncoder::for_model("traffic_model", &schema).unwrap();
        let row = encoder.encode(&traffic("Rain"));
        assert_eq!(row.values(), &[8.0, 0.0, 150.0, 0.0, 1.0]);
        assert_eq!(row.columns(), schema.columns());
    }

    #[test]
    fn test_baseline_category_reads_all_zero() {
        let schema = traffic_schema();
        let encoder = FeatureEncoder::for_model("traffic_model", &schema).unwrap();
        let row = encoder.encode(&traffic("Clear"));
        assert_eq!(row.get("weather_Fog"), Some(0.0));
        assert_eq!(row.get("weather_Rain"), Some(0.0));
    }

    #[test]
    fn test_unseen_category_reads_all_zero() {
        let schema = traffic_schema();
        let encoder = FeatureEncoder::for_model("traffic_model", &schema).unwrap();
        let row = encoder.encode(&traffic("Snow"));
        assert_eq!(row.values(), &[8.0, 0.0, 150.0, 0.0, 0.0]);
    }

    #[test]
    fn test_schema_order_is_respected() {
        let schema = ModelSchema::new(["weather_Rain", "vehicle_count", "hour"]);
        let encoder = FeatureEncoder::for_model("traffic_model", &schema).unwrap();
        let row = encoder.encode(&traffic("Rain"));
        // day_of_week is not in the schema and is dropped
        assert_eq!(row.values(), &[1.0, 150.0, 8.0]);
    }

    #[test]
    fn test_missing_numeric_column_is_zero_filled() {
        let schema = ModelSchema::new(["hour", "humidity"]);
        let encoder = FeatureEncoder::for_model("energy_model", &schema).unwrap();
        let row = encoder.encode(&EnergyInput {
            hour: 14,
            day_of_week: 3,
            temperature: 21.5,
            grid_load_mw: 420,
        });
        assert_eq!(row.values(), &[14.0, 0.0]);
    }

    #[test]
    fn test_float_passes_through_unscaled() {
        let schema = ModelSchema::new(Domain::Energy.reference_schema().iter().copied());
        let encoder = FeatureEncoder::for_model("energy_model", &schema).unwrap();
        let row = encoder.encode(&EnergyInput {
            hour: 14,
            day_of_week: 3,
            temperature: -4.25,
            grid_load_mw: 420,
        });
        assert_eq!(row.get("temperature"), Some(-4.25));
        assert_eq!(row.get("grid_load_mw"), Some(420.0));
    }

    #[test]
    fn test_two_categorical_fields() {
        let schema = ModelSchema::new(Domain::Emergency.reference_schema().iter().copied());
        let encoder = FeatureEncoder::for_model("emergency_model", &schema).unwrap();
        let row = encoder.encode(&EmergencyInput {
            hour: 23,
            day_of_week: 5,
            weather: "Fog".into(),
            traffic_level: "Low".into(),
        });
        assert_eq!(row.values(), &[23.0, 5.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_waste_recycling_indicator() {
        let schema = ModelSchema::new(Domain::Waste.reference_schema().iter().copied());
        let encoder = FeatureEncoder::for_model("waste_model", &schema).unwrap();
        let row = encoder.encode(&WasteInput {
            bin_type: "Recycling".into(),
            fill_level_percent: 150,
            days_since_collection: 2,
        });
        assert_eq!(row.values(), &[150.0, 2.0, 1.0]);
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        let schema = ModelSchema::empty();
        let err = FeatureEncoder::for_model("waste_model", &schema).err().unwrap();
        assert_eq!(err, PredictError::FeatureSchemaUnavailable("waste_model".into()));
    }

    proptest! {
        #[test]
        fn prop_row_matches_schema(
            hour in 0i64..24,
            day in 0i64..7,
            count in 0i64..1000,
            weather in prop::sample::select(vec!["Clear", "Rain", "Fog", "Hail"]),
        ) {
            let schema = traffic_schema();
            let encoder = FeatureEncoder::for_model("traffic_model", &schema).unwrap();
            let input = TrafficInput {
                hour,
                day_of_week: day,
                weather: weather.to_string(),
                vehicle_count: count,
            };

            let first = encoder.encode(&input);
            let second = encoder.encode(&input);

            prop_assert_eq!(first.len(), schema.len());
            prop_assert_eq!(first.columns(), schema.columns());
            prop_assert_eq!(&first, &second);

            let indicators = first.get("weather_Fog").unwrap() + first.get("weather_Rain").unwrap();
            prop_assert!(indicators <= 1.0);
        }
    }
}
