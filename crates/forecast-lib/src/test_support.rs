//! Helpers shared by unit tests across modules

use crate::error::PredictError;
use crate::predictor::{EncodedRow, Predictor};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Predictor returning fixed outputs and recording the rows it saw
pub struct FixedPredictor {
    pub point: f32,
    pub probabilities: Vec<f32>,
    pub classes: Option<Vec<i64>>,
    pub calls: AtomicUsize,
    pub last_row: std::sync::Mutex<Option<Vec<f32>>>,
}

impl FixedPredictor {
    pub fn regressor(point: f32) -> Self {
        Self {
            point,
            probabilities: Vec::new(),
            classes: None,
            calls: AtomicUsize::new(0),
            last_row: std::sync::Mutex::new(None),
        }
    }

    pub fn classifier(probabilities: Vec<f32>) -> Self {
        let classes = (0..probabilities.len() as i64).collect();
        Self {
            point: 0.0,
            probabilities,
            classes: Some(classes),
            calls: AtomicUsize::new(0),
            last_row: std::sync::Mutex::new(None),
        }
    }

    pub fn seen_row(&self) -> Option<Vec<f32>> {
        self.last_row.lock().unwrap().clone()
    }

    fn record(&self, row: &EncodedRow) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_row.lock().unwrap() = Some(row.values().to_vec());
    }
}

impl Predictor for FixedPredictor {
    fn predict(&self, row: &EncodedRow) -> Result<f32, PredictError> {
        self.record(row);
        Ok(self.point)
    }

    fn predict_proba(&self, row: &EncodedRow) -> Result<Vec<f32>, PredictError> {
        self.record(row);
        Ok(self.probabilities.clone())
    }

    fn classes(&self) -> Option<Vec<i64>> {
        self.classes.clone()
    }

    fn format(&self) -> &'static str {
        "fixed"
    }
}

/// Single-leaf regressor artifact that always predicts `value`
pub fn constant_regressor(n_features: usize, value: f32) -> Value {
    json!({
        "kind": "regressor",
        "n_features": n_features,
        "trees": [{ "nodes": [{ "left": -1, "right": -1, "value": [value] }] }]
    })
}

/// Single-leaf binary classifier artifact with P(class 1) = `p1`
pub fn constant_classifier(n_features: usize, p1: f32) -> Value {
    json!({
        "kind": "classifier",
        "n_features": n_features,
        "classes": [0, 1],
        "trees": [{ "nodes": [{ "left": -1, "right": -1, "value": [1.0 - p1, p1] }] }]
    })
}

pub fn write_json(dir: &Path, file_name: &str, value: &Value) {
    std::fs::write(dir.join(file_name), value.to_string()).unwrap();
}

pub fn write_schema(dir: &Path, model: &str, columns: &[&str]) {
    write_json(dir, &format!("{}_features.json", model), &json!(columns));
}
