//! Error types for artifact loading and prediction serving

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read a predictor or schema artifact from disk.
///
/// These never abort startup: the registry logs them and either skips the
/// model (predictor artifact) or registers it in degraded mode (schema).
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load ONNX model {path:?}: {reason}")]
    Onnx { path: PathBuf, reason: String },

    #[error("invalid model artifact {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("duplicate predictor artifact {path:?} for model '{model}'")]
    Duplicate { model: String, path: PathBuf },
}

/// Lookup failures against the model registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("model '{0}' not found")]
    ModelNotFound(String),
}

/// Request-time failures. Every variant is reported to clients through the
/// soft-failure envelope rather than a protocol-level error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("{0} not loaded")]
    ModelNotLoaded(String),

    #[error("feature schema for model '{0}' is unavailable")]
    FeatureSchemaUnavailable(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("model expects {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("expected a binary classifier with classes [0, 1], got {0}")]
    NotBinaryClassifier(String),

    #[error("model returned a non-finite value")]
    NonFiniteOutput,
}

impl From<RegistryError> for PredictError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ModelNotFound(name) => PredictError::ModelNotLoaded(name),
        }
    }
}
