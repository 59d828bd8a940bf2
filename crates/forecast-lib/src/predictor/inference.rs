//! ONNX inference using tract
//!
//! Loads models exported from the training toolkit as ONNX graphs. Regressors
//! produce a single float output; classifiers produce a label tensor followed
//! by a `[1, n_classes]` probability tensor.

use super::features::EncodedRow;
use super::Predictor;
use crate::error::{ArtifactError, PredictError};
use std::path::Path;
use std::time::Instant;
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Node attributes that carry integer class labels in ONNX-ML classifiers
const CLASS_LABEL_ATTRIBUTES: [&str; 2] = ["classlabels_int64s", "classlabels_ints"];

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based predictor using tract for lightweight inference
pub struct OnnxPredictor {
    model: TractModel,
    n_features: Option<usize>,
    classes: Option<Vec<i64>>,
}

impl OnnxPredictor {
    /// Load a model from disk. When `n_features` is known the input shape is
    /// pinned to `[1, n_features]` before optimization.
    pub fn load(path: &Path, n_features: Option<usize>) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, n_features).map_err(|e| ArtifactError::Onnx {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })
    }

    pub fn from_bytes(model_bytes: &[u8], n_features: Option<usize>) -> TractResult<Self> {
        let proto = tract_onnx::onnx().proto_model_for_read(&mut std::io::Cursor::new(model_bytes))?;
        Self::from_proto(&proto, n_features)
    }

    /// Build a predictor from an already decoded model
    pub fn from_proto(proto: &ModelProto, n_features: Option<usize>) -> TractResult<Self> {
        let mut model = tract_onnx::onnx().model_for_proto_model(proto)?;
        if let Some(n) = n_features {
            model = model.with_input_fact(0, f32::fact([1, n]).into())?;
        }
        let model = model.into_optimized()?.into_runnable()?;

        let classes = declared_classes(proto);
        if let Some(classes) = &classes {
            debug!(classes = ?classes, "ONNX model declares class labels");
        }

        Ok(Self {
            model,
            n_features,
            classes,
        })
    }

    fn run(&self, row: &EncodedRow) -> Result<TVec<TValue>, PredictError> {
        if let Some(expected) = self.n_features {
            if row.len() != expected {
                return Err(PredictError::FeatureCountMismatch {
                    expected,
                    actual: row.len(),
                });
            }
        }

        let start = Instant::now();
        let input = Tensor::from_shape(&[1, row.len()], row.values())
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictError::Inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }
}

/// First non-empty integer class label list declared by a graph node
fn declared_classes(proto: &ModelProto) -> Option<Vec<i64>> {
    let graph = proto.graph.as_ref()?;
    graph
        .node
        .iter()
        .flat_map(|node| node.attribute.iter())
        .find(|attr| CLASS_LABEL_ATTRIBUTES.contains(&attr.name.as_str()) && !attr.ints.is_empty())
        .map(|attr| attr.ints.clone())
}

impl Predictor for OnnxPredictor {
    fn predict(&self, row: &EncodedRow) -> Result<f32, PredictError> {
        let outputs = self.run(row)?;
        let first = outputs
            .first()
            .ok_or_else(|| PredictError::Inference("model produced no outputs".to_string()))?;
        let values = first
            .cast_to::<f32>()
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let slice = values
            .as_slice::<f32>()
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        slice
            .first()
            .copied()
            .ok_or_else(|| PredictError::Inference("empty prediction tensor".to_string()))
    }

    fn predict_proba(&self, row: &EncodedRow) -> Result<Vec<f32>, PredictError> {
        let outputs = self.run(row)?;
        let probabilities = outputs
            .iter()
            .find(|o| o.datum_type() == f32::datum_type() && o.len() >= 2)
            .ok_or_else(|| {
                PredictError::Inference("model produced no probability output".to_string())
            })?;
        probabilities
            .as_slice::<f32>()
            .map(|s| s.to_vec())
            .map_err(|e| PredictError::Inference(e.to_string()))
    }

    fn classes(&self) -> Option<Vec<i64>> {
        self.classes.clone()
    }

    fn format(&self) -> &'static str {
        "onnx"
    }
}
