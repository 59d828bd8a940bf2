//! Feature schemas recorded at training time
//!
//! A schema is the ordered list of column names a model was fit on. The
//! order defines column alignment at serving time, so it is kept exactly as
//! read from the `{model}_features.json` artifact.

use crate::error::ArtifactError;
use std::path::Path;
use std::sync::Arc;

/// Suffix appended to a model's base name to form its schema artifact
pub const SCHEMA_SUFFIX: &str = "_features.json";

/// Ordered feature columns for one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSchema {
    columns: Arc<[String]>,
}

impl ModelSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema for a model registered without a schema artifact
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a schema artifact (a JSON array of column names)
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// True when this schema has the same columns in the same order
    pub fn matches(&self, columns: &[&str]) -> bool {
        self.columns.len() == columns.len()
            && self.columns.iter().zip(columns).all(|(a, b)| a == b)
    }
}
