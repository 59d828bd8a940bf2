//! Tree-ensemble predictors stored as JSON
//!
//! The artifact mirrors a fitted random forest: every tree is a flat node
//! array in depth-first order. A node with `left == -1` is a leaf. Internal
//! nodes send a row left when `row[feature] <= threshold`. Regressor leaves
//! hold the mean target in `value[0]`; classifier leaves hold per-class
//! sample counts (or fractions) in `value`.

use super::features::EncodedRow;
use super::Predictor;
use crate::error::{ArtifactError, PredictError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Child index marking a leaf
const LEAF: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleKind {
    Regressor,
    Classifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: i64,
    #[serde(default)]
    pub threshold: f32,
    pub left: i64,
    pub right: i64,
    #[serde(default)]
    pub value: Vec<f32>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.left == LEAF
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf(&self, row: &[f32]) -> &TreeNode {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node;
            }
            // Validated at load: feature in range and children after parent
            let x = row[node.feature as usize];
            idx = if x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    fn validate(&self, n_features: usize, outputs: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let n_nodes = self.nodes.len() as i64;
        for (i, node) in self.nodes.iter().enumerate() {
            let i = i as i64;
            if node.is_leaf() {
                if node.value.len() != outputs {
                    return Err(format!(
                        "leaf {} has {} values, expected {}",
                        i,
                        node.value.len(),
                        outputs
                    ));
                }
                continue;
            }
            if node.feature < 0 || node.feature as usize >= n_features {
                return Err(format!("node {} splits on feature {}", i, node.feature));
            }
            for child in [node.left, node.right] {
                if child <= i || child >= n_nodes {
                    return Err(format!("node {} has invalid child {}", i, child));
                }
            }
        }
        Ok(())
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub kind: EnsembleKind,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<i64>>,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ensemble: TreeEnsemble =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        ensemble.validate().map_err(|reason| ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(ensemble)
    }

    /// Structural checks that make traversal panic-free
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        if self.n_features == 0 {
            return Err("ensemble declares zero features".to_string());
        }
        let outputs = match self.kind {
            EnsembleKind::Regressor => 1,
            EnsembleKind::Classifier => {
                let n = self.n_classes();
                if n < 2 {
                    return Err("classifier needs at least two classes".to_string());
                }
                n
            }
        };
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, outputs)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    fn n_classes(&self) -> usize {
        match &self.classes {
            Some(classes) => classes.len(),
            None => self
                .trees
                .first()
                .and_then(|t| t.nodes.iter().find(|n| n.is_leaf()))
                .map(|n| n.value.len())
                .unwrap_or(0),
        }
    }

    fn check_row<'r>(&self, row: &'r EncodedRow) -> Result<&'r [f32], PredictError> {
        if row.len() != self.n_features {
            return Err(PredictError::FeatureCountMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(row.values())
    }

    fn mean_probabilities(&self, row: &[f32]) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.n_classes()];
        for tree in &self.trees {
            let leaf = tree.leaf(row);
            let total: f32 = leaf.value.iter().sum();
            if total > 0.0 {
                for (a, v) in acc.iter_mut().zip(&leaf.value) {
                    *a += v / total;
                }
            }
        }
        let n_trees = self.trees.len() as f32;
        acc.iter_mut().for_each(|a| *a /= n_trees);
        acc
    }
}

impl Predictor for TreeEnsemble {
    fn predict(&self, row: &EncodedRow) -> Result<f32, PredictError> {
        let values = self.check_row(row)?;
        match self.kind {
            EnsembleKind::Regressor => {
                let sum: f32 = self.trees.iter().map(|t| t.leaf(values).value[0]).sum();
                Ok(sum / self.trees.len() as f32)
            }
            EnsembleKind::Classifier => {
                let probabilities = self.mean_probabilities(values);
                let best = probabilities
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let label = self
                    .classes
                    .as_ref()
                    .and_then(|c| c.get(best).copied())
                    .unwrap_or(best as i64);
                Ok(label as f32)
            }
        }
    }

    fn predict_proba(&self, row: &EncodedRow) -> Result<Vec<f32>, PredictError> {
        let values = self.check_row(row)?;
        match self.kind {
            EnsembleKind::Classifier => Ok(self.mean_probabilities(values)),
            EnsembleKind::Regressor => Err(PredictError::Inference(
                "regressor does not produce class probabilities".to_string(),
            )),
        }
    }

    fn classes(&self) -> Option<Vec<i64>> {
        match self.kind {
            EnsembleKind::Classifier => Some(
                self.classes
                    .clone()
                    .unwrap_or_else(|| (0..self.n_classes() as i64).collect()),
            ),
            EnsembleKind::Regressor => None,
        }
    }

    fn format(&self) -> &'static str {
        "tree-ensemble"
    }
}
