//! Model registry
//!
//! Maps model names to a trained predictor and its feature schema. The
//! registry is populated once at startup from a directory of artifacts and
//! is read-only afterwards, so request handlers share it through an `Arc`
//! without locking.
//!
//! Artifacts are paired by base name: `traffic_model.onnx` (or
//! `traffic_model.json` for a tree ensemble) and the optional
//! `traffic_model_features.json` schema.

use crate::error::{ArtifactError, RegistryError};
use crate::models::Domain;
use crate::predictor::{is_predictor_artifact, load_predictor, Predictor};
use crate::schema::{ModelSchema, SCHEMA_SUFFIX};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// A registered model: predictor plus the schema it was trained with
#[derive(Clone)]
pub struct LoadedModel {
    predictor: Arc<dyn Predictor>,
    schema: ModelSchema,
}

impl LoadedModel {
    pub fn new(predictor: Arc<dyn Predictor>, schema: ModelSchema) -> Self {
        Self { predictor, schema }
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Loaded without a usable schema; every prediction will fail
    pub fn is_degraded(&self) -> bool {
        self.schema.is_empty()
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("format", &self.predictor.format())
            .field("schema", &self.schema)
            .finish()
    }
}

/// A predictor artifact that could not be registered
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFailure {
    pub model: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a directory load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Models registered with a schema
    pub loaded: Vec<String>,
    /// Models registered with an empty schema
    pub degraded: Vec<String>,
    pub failures: Vec<ArtifactFailure>,
    /// Set when the model directory itself could not be listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

impl LoadReport {
    pub fn total_registered(&self) -> usize {
        self.loaded.len() + self.degraded.len()
    }

    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty() && self.failures.is_empty() && !self.loaded.is_empty()
    }
}

/// Read-only mapping from model name to loaded model
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, LoadedModel>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Scan `source_dir` and load every predictor artifact found.
    ///
    /// Individual artifact failures are logged and reported, never fatal.
    pub fn load(source_dir: &Path) -> (Self, LoadReport) {
        let mut builder = ModelRegistryBuilder::default();
        let mut report = LoadReport::default();

        let artifacts = match list_predictor_artifacts(source_dir) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(dir = ?source_dir, error = %e, "Model directory unreadable, no models loaded");
                report.source_error = Some(format!("{}: {}", source_dir.display(), e));
                return (builder.build(), report);
            }
        };

        if artifacts.is_empty() {
            warn!(dir = ?source_dir, "No model artifacts found");
        }

        for (model, path) in artifacts {
            if builder.contains(&model) {
                let err = ArtifactError::Duplicate {
                    model: model.clone(),
                    path: path.clone(),
                };
                warn!(model = %model, error = %err, "Skipping duplicate predictor artifact");
                report.failures.push(ArtifactFailure {
                    model,
                    path,
                    reason: err.to_string(),
                });
                continue;
            }

            let schema = load_schema(source_dir, &model);
            let n_features = (!schema.is_empty()).then(|| schema.len());

            let predictor = match load_predictor(&path, n_features) {
                Ok(predictor) => predictor,
                Err(e) => {
                    warn!(model = %model, error = %e, "Failed to load predictor artifact");
                    report.failures.push(ArtifactFailure {
                        model,
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            check_domain_contract(&model, predictor.as_ref(), &schema);

            if schema.is_empty() {
                report.degraded.push(model.clone());
            } else {
                info!(
                    model = %model,
                    format = predictor.format(),
                    features = schema.len(),
                    "Loaded model with features"
                );
                report.loaded.push(model.clone());
            }
            builder = builder.register(model, predictor, schema);
        }

        let registry = builder.build();
        if registry.is_empty() {
            warn!(dir = ?source_dir, "No models loaded; prediction routes will report models as not loaded");
        }
        (registry, report)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&LoadedModel, RegistryError> {
        self.models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    /// Registered model names in sorted order
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn degraded_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .iter()
            .filter(|(_, m)| m.is_degraded())
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Builds a registry from predictors constructed in code
#[derive(Default)]
pub struct ModelRegistryBuilder {
    models: HashMap<String, LoadedModel>,
}

impl ModelRegistryBuilder {
    pub fn register(
        mut self,
        name: impl Into<String>,
        predictor: Arc<dyn Predictor>,
        schema: ModelSchema,
    ) -> Self {
        self.models.insert(name.into(), LoadedModel::new(predictor, schema));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            models: self.models,
        }
    }
}

fn list_predictor_artifacts(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_predictor_artifact(file_name) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        artifacts.push((stem.to_string(), path.clone()));
    }
    artifacts.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(artifacts)
}

fn load_schema(dir: &Path, model: &str) -> ModelSchema {
    let path = dir.join(format!("{}{}", model, SCHEMA_SUFFIX));
    if !path.exists() {
        warn!(
            model = %model,
            schema = ?path,
            "Loaded model but feature file missing; model is degraded"
        );
        return ModelSchema::empty();
    }
    match ModelSchema::load(&path) {
        Ok(schema) => {
            if schema.is_empty() {
                warn!(model = %model, schema = ?path, "Feature file is empty; model is degraded");
            }
            schema
        }
        Err(e) => {
            warn!(model = %model, error = %e, "Feature file unreadable; model is degraded");
            ModelSchema::empty()
        }
    }
}

/// Warn about artifacts that will not behave the way their domain expects
fn check_domain_contract(model: &str, predictor: &dyn Predictor, schema: &ModelSchema) {
    let Some(domain) = Domain::from_model_name(model) else {
        return;
    };

    if !schema.is_empty() && !schema.matches(domain.reference_schema()) {
        warn!(
            model = %model,
            schema = ?schema.columns(),
            expected = ?domain.reference_schema(),
            "Feature schema differs from the training layout for this domain"
        );
    }

    if domain == Domain::Emergency {
        if let Some(classes) = predictor.classes() {
            if classes != [0, 1] {
                warn!(
                    model = %model,
                    classes = ?classes,
                    "Emergency model is not a binary classifier with classes [0, 1]"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        constant_classifier, constant_regressor, write_json, write_schema, FixedPredictor,
    };
    use tempfile::TempDir;

    const TRAFFIC_SCHEMA: &[&str] =
        &["hour", "day_of_week", "vehicle_count", "weather_Fog", "weather_Rain"];

    #[test]
    fn test_load_predictor_with_schema() {
        let dir = TempDir::new().unwrap();
        write_json(dir.path(), "traffic_model.json", &constant_regressor(5, 180.0));
        write_schema(dir.path(), "traffic_model", TRAFFIC_SCHEMA);

        let (registry, report) = ModelRegistry::load(dir.path());

        assert!(registry.is_loaded("traffic_model"));
        assert_eq!(report.loaded, vec!["traffic_model"]);
        assert!(report.degraded.is_empty());
        assert!(report.is_clean());
        let model = registry.get("traffic_model").unwrap();
        assert_eq!(model.schema().columns(), TRAFFIC_SCHEMA);
        assert!(!model.is_degraded());
    }

    #[test]
    fn test_missing_schema_registers_degraded_model() {
        let dir = TempDir::new().unwrap();
        write_json(dir.path(), "waste_model.json", &constant_regressor(3, 55.0));

        let (registry, report) = ModelRegistry::load(dir.path());

        assert!(registry.is_loaded("waste_model"));
        assert_eq!(report.degraded, vec!["waste_model"]);
        assert!(report.loaded.is_empty());
        assert!(!report.is_clean());
        assert!(registry.get("waste_model").unwrap().schema().is_empty());
        assert_eq!(registry.degraded_models(), vec!["waste_model"]);
    }

    #[test]
    fn test_corrupt_schema_registers_degraded_model() {
        let dir = TempDir::new().unwrap();
        write_json(dir.path(), "energy_model.json", &constant_regressor(4, 300.0));
        std::fs::write(dir.path().join("energy_model_features.json"), b"[\"hour\", ").unwrap();

        let (registry, report) = ModelRegistry::load(dir.path());

        assert!(registry.get("energy_model").unwrap().is_degraded());
        assert_eq!(report.degraded, vec!["energy_model"]);
    }

    #[test]
    fn test_corrupt_predictor_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("traffic_model.onnx"), [0xffu8; 32]).unwrap();
        write_schema(dir.path(), "traffic_model", TRAFFIC_SCHEMA);
        write_json(dir.path(), "pollution_model.json", &constant_regressor(3, 42.0));
        write_schema(dir.path(), "pollution_model", &["hour", "aqi", "traffic_level_Low"]);

        let (registry, report) = ModelRegistry::load(dir.path());

        assert!(!registry.is_loaded("traffic_model"));
        assert!(registry.is_loaded("pollution_model"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].model, "traffic_model");
        assert_eq!(report.total_registered(), 1);
    }

    #[test]
    fn test_duplicate_base_name_keeps_first() {
        let dir = TempDir::new().unwrap();
        write_json(dir.path(), "waste_model.json", &constant_regressor(3, 10.0));
        std::fs::write(dir.path().join("waste_model.onnx"), [0u8; 8]).unwrap();
        write_schema(dir.path(), "waste_model", &["fill_level_percent", "days_since_collection", "bin_type_Recycling"]);

        let (registry, report) = ModelRegistry::load(dir.path());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("waste_model").unwrap().predictor().format(), "tree-ensemble");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let (registry, report) = ModelRegistry::load(&dir.path().join("nope"));
        assert!(registry.is_empty());
        assert_eq!(report.total_registered(), 0);
        assert!(report.source_error.as_deref().unwrap().contains("nope"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), b"models live here").unwrap();
        write_schema(dir.path(), "orphan_model", &["hour"]);
        std::fs::create_dir(dir.path().join("archive.json")).unwrap();

        let (registry, report) = ModelRegistry::load(dir.path());
        assert!(registry.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_all_domains_load() {
        let dir = TempDir::new().unwrap();
        for domain in Domain::ALL {
            let schema = domain.reference_schema();
            let artifact = if domain == Domain::Emergency {
                constant_classifier(schema.len(), 0.3)
            } else {
                constant_regressor(schema.len(), 1.0)
            };
            write_json(dir.path(), &format!("{}.json", domain.model_name()), &artifact);
            write_schema(dir.path(), domain.model_name(), schema);
        }

        let (registry, report) = ModelRegistry::load(dir.path());
        assert_eq!(report.loaded.len(), 5);
        assert_eq!(
            registry.model_names(),
            vec![
                "emergency_model",
                "energy_model",
                "pollution_model",
                "traffic_model",
                "waste_model"
            ]
        );
        assert_eq!(
            registry.get("emergency_model").unwrap().predictor().classes(),
            Some(vec![0, 1])
        );
    }

    #[test]
    fn test_get_unknown_model() {
        let registry = ModelRegistry::builder()
            .register(
                "traffic_model",
                Arc::new(FixedPredictor::regressor(1.0)),
                ModelSchema::new(TRAFFIC_SCHEMA.iter().copied()),
            )
            .build();

        assert!(registry.is_loaded("traffic_model"));
        assert_eq!(
            registry.get("energy_model").unwrap_err(),
            RegistryError::ModelNotFound("energy_model".into())
        );
    }
}
