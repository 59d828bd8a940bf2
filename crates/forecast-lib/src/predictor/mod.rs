//! ML prediction engine

mod features;
mod forest;
mod inference;
mod output;

pub use features::{indicator_column, EncodedRow, FeatureEncoder};
pub use forest::{EnsembleKind, Tree, TreeEnsemble, TreeNode};
pub use inference::OnnxPredictor;
pub use output::{
    round_to, OutputConfig, OutputFormatter, OutputRule, PROBABILITY_DECIMALS,
    REGRESSION_DECIMALS,
};

use crate::error::{ArtifactError, PredictError};
use std::path::Path;
use std::sync::Arc;

/// File extension of ONNX predictor artifacts
pub const ONNX_EXTENSION: &str = "onnx";

/// File extension of tree-ensemble predictor artifacts
pub const ENSEMBLE_EXTENSION: &str = "json";

/// Trait for trained model implementations
pub trait Predictor: Send + Sync {
    /// Point prediction for a single row
    fn predict(&self, row: &EncodedRow) -> Result<f32, PredictError>;

    /// Class probability distribution for a single row
    fn predict_proba(&self, row: &EncodedRow) -> Result<Vec<f32>, PredictError>;

    /// Class labels in probability order, when the artifact declares them
    fn classes(&self) -> Option<Vec<i64>> {
        None
    }

    /// Short name of the artifact format, for logs and status output
    fn format(&self) -> &'static str;
}

/// Load a predictor artifact, choosing the backend from the file extension.
///
/// `n_features` pins the ONNX input shape when the schema is known.
pub fn load_predictor(
    path: &Path,
    n_features: Option<usize>,
) -> Result<Arc<dyn Predictor>, ArtifactError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ONNX_EXTENSION) => Ok(Arc::new(OnnxPredictor::load(path, n_features)?)),
        Some(ENSEMBLE_EXTENSION) => Ok(Arc::new(TreeEnsemble::load(path)?)),
        _ => Err(ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason: "unsupported predictor artifact extension".to_string(),
        }),
    }
}

/// Returns true for file names that look like predictor artifacts
pub fn is_predictor_artifact(file_name: &str) -> bool {
    if file_name.ends_with(crate::schema::SCHEMA_SUFFIX) {
        return false;
    }
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext == ONNX_EXTENSION || ext == ENSEMBLE_EXTENSION)
        .unwrap_or(false)
}
