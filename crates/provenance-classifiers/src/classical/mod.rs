//! Classical tabular classifiers (DRF, GBM, GLM)
//!
//! Each model is a JSON artifact exported after training. The artifact
//! names its input columns in training order; at prediction time those
//! names are resolved against the schema of the incoming
//! [`FeatureVector`], so a model only ever sees columns it was trained on.
//!
//! ```json
//! {
//!   "algorithm": "gradient_boosting",
//!   "feature_names": ["delve", "the"],
//!   "init_score": -0.2,
//!   "trees": [{"nodes": [{"feature": 0, "threshold": 0.1, "left": 1, "right": 2},
//!                        {"value": -0.5}, {"value": 0.8}]}]
//! }
//! ```

mod linear;
mod tree;

pub use linear::LinearModel;
pub use tree::{DecisionTree, TreeNode};

use crate::classifier::{FeatureClassifier, FeatureImportance};
use crate::features::FeatureVector;
use async_trait::async_trait;
use parking_lot::RwLock;
use provenance_core::{ClassificationResult, Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Default decision threshold on `p(HUMAN)`
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Model body, tagged by `algorithm`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassicalModel {
    /// Distributed random forest: mean of per-tree leaf probabilities
    RandomForest { trees: Vec<DecisionTree> },

    /// Gradient boosting: logistic of the summed leaf margins
    GradientBoosting {
        #[serde(default)]
        init_score: f64,
        trees: Vec<DecisionTree>,
    },

    /// Binomial GLM
    Linear(LinearModel),
}

impl ClassicalModel {
    fn validate(&self, width: usize) -> Result<()> {
        match self {
            Self::RandomForest { trees } | Self::GradientBoosting { trees, .. } => {
                if trees.is_empty() {
                    return Err(Error::config("ensemble artifact has no trees"));
                }
                for (idx, tree) in trees.iter().enumerate() {
                    tree.validate(width)
                        .map_err(|e| Error::config(format!("tree {}: {}", idx, e)))?;
                }
                Ok(())
            }
            Self::Linear(model) => model.validate(width),
        }
    }

    /// Probability of HUMAN for a row in the model's own column order
    fn human_probability(&self, row: &[f64]) -> Result<f64> {
        match self {
            Self::RandomForest { trees } => {
                let mut total = 0.0;
                for tree in trees {
                    total += tree.evaluate(row)?;
                }
                Ok((total / trees.len() as f64).clamp(0.0, 1.0))
            }
            Self::GradientBoosting { init_score, trees } => {
                let mut margin = *init_score;
                for tree in trees {
                    margin += tree.evaluate(row)?;
                }
                Ok(sigmoid(margin))
            }
            Self::Linear(model) => Ok(sigmoid(model.margin(row))),
        }
    }

    /// Per-input scores used when the artifact carries no importances
    fn derived_importance(&self, width: usize) -> Vec<f64> {
        match self {
            Self::RandomForest { trees } | Self::GradientBoosting { trees, .. } => {
                let mut counts = vec![0usize; width];
                for tree in trees {
                    tree.count_splits(&mut counts);
                }
                counts.into_iter().map(|c| c as f64).collect()
            }
            Self::Linear(model) => model.magnitudes(),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::RandomForest { .. } => "random_forest",
            Self::GradientBoosting { .. } => "gradient_boosting",
            Self::Linear(_) => "linear",
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Deserialize)]
struct ClassicalArtifact {
    feature_names: Vec<String>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    variable_importances: Option<Vec<FeatureImportance>>,
    #[serde(flatten)]
    model: ClassicalModel,
}

/// Column positions resolved against one schema version
#[derive(Debug, Clone)]
struct ResolvedColumns {
    fingerprint: String,
    positions: Vec<usize>,
}

/// A classical model loaded from its JSON artifact
#[derive(Debug)]
pub struct ClassicalClassifier {
    name: String,
    feature_names: Vec<String>,
    threshold: f64,
    importances: Vec<FeatureImportance>,
    model: ClassicalModel,
    resolved: RwLock<Option<ResolvedColumns>>,
}

impl ClassicalClassifier {
    /// Load an artifact from disk
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let name = name.into();
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read {} artifact {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        let classifier = Self::from_json(name, &contents)?;

        debug!(
            model = %classifier.name,
            algorithm = classifier.model.algorithm(),
            inputs = classifier.feature_names.len(),
            path = %path.display(),
            "Loaded classical model artifact"
        );
        Ok(classifier)
    }

    /// Parse an artifact
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let artifact: ClassicalArtifact = serde_json::from_str(json)?;
        Self::from_parts(
            name,
            artifact.feature_names,
            artifact.model,
            artifact.threshold,
            artifact.variable_importances,
        )
    }

    /// Assemble a classifier from an in-memory model
    pub fn from_parts(
        name: impl Into<String>,
        feature_names: Vec<String>,
        model: ClassicalModel,
        threshold: Option<f64>,
        importances: Option<Vec<FeatureImportance>>,
    ) -> Result<Self> {
        let name = name.into();
        if feature_names.is_empty() {
            return Err(Error::config(format!("{} artifact has no feature names", name)));
        }
        model.validate(feature_names.len())?;

        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::config(format!(
                "{} threshold {} is outside [0, 1]",
                name, threshold
            )));
        }

        let importances = match importances {
            Some(ranked) if !ranked.is_empty() => ranked,
            _ => rank(&feature_names, &model.derived_importance(feature_names.len())),
        };

        Ok(Self {
            name,
            feature_names,
            threshold,
            importances,
            model,
            resolved: RwLock::new(None),
        })
    }

    pub fn model(&self) -> &ClassicalModel {
        &self.model
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn positions(&self, features: &FeatureVector) -> Result<Vec<usize>> {
        let schema = features.schema();
        if let Some(resolved) = self.resolved.read().as_ref() {
            if resolved.fingerprint == schema.fingerprint() {
                return Ok(resolved.positions.clone());
            }
        }

        let positions = schema.resolve(&self.feature_names)?;
        *self.resolved.write() = Some(ResolvedColumns {
            fingerprint: schema.fingerprint().to_string(),
            positions: positions.clone(),
        });
        Ok(positions)
    }
}

/// Rank columns by score, highest first; ties keep column order
fn rank(names: &[String], scores: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(scores)
        .map(|(name, score)| FeatureImportance::new(name.clone(), *score))
        .collect();
    ranked.sort_by(|a, b| b.relative_importance.total_cmp(&a.relative_importance));
    ranked
}

#[async_trait]
impl FeatureClassifier for ClassicalClassifier {
    async fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult> {
        let positions = self.positions(features)?;
        let row = features.gather(&positions);
        let p_human = self.model.human_probability(&row)?;
        Ok(ClassificationResult::from_human_probability(
            p_human,
            self.threshold,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn feature_importance(&self) -> Option<Vec<FeatureImportance>> {
        Some(self.importances.clone())
    }
}
