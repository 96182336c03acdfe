//! Classifier traits and the tagged model handle

use crate::features::FeatureVector;
use async_trait::async_trait;
use provenance_core::{ClassificationResult, Error, ModelFamily, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sequence classifier over raw text.
///
/// Implementations own their tokenizer and weights. Input longer than the
/// model's window is truncated, not rejected.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify the given text
    async fn predict(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Tabular classifier over the shared feature vector
#[async_trait]
pub trait FeatureClassifier: Send + Sync {
    /// Classify a feature vector produced by the registry's extractor
    async fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Input columns in the order the model was trained on
    fn feature_names(&self) -> &[String];

    /// Ranked feature list, most important first.
    ///
    /// `None` when the model cannot introspect its inputs.
    fn feature_importance(&self) -> Option<Vec<FeatureImportance>>;
}

/// One entry of a model's ranked feature list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Column name
    pub variable: String,

    /// Importance score; only the ordering is relied on
    pub relative_importance: f64,
}

impl FeatureImportance {
    pub fn new(variable: impl Into<String>, relative_importance: f64) -> Self {
        Self {
            variable: variable.into(),
            relative_importance,
        }
    }
}

/// Input to a single prediction
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    Text(&'a str),
    Features(&'a FeatureVector),
}

/// A loaded classifier, tagged by model family
#[derive(Clone)]
pub enum ModelHandle {
    Neural(Arc<dyn TextClassifier>),
    Classical(Arc<dyn FeatureClassifier>),
}

impl ModelHandle {
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::Neural(_) => ModelFamily::Neural,
            Self::Classical(_) => ModelFamily::Classical,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Neural(classifier) => classifier.name(),
            Self::Classical(classifier) => classifier.name(),
        }
    }

    /// Run the classifier on an input of the matching shape
    pub async fn predict(&self, input: ModelInput<'_>) -> Result<ClassificationResult> {
        match (self, input) {
            (Self::Neural(classifier), ModelInput::Text(text)) => classifier.predict(text).await,
            (Self::Classical(classifier), ModelInput::Features(features)) => {
                classifier.predict(features).await
            }
            (handle, _) => Err(Error::internal(format!(
                "{:?} model '{}' received input of the wrong shape",
                handle.family(),
                handle.name()
            ))),
        }
    }

    pub fn as_classical(&self) -> Option<&Arc<dyn FeatureClassifier>> {
        match self {
            Self::Classical(classifier) => Some(classifier),
            Self::Neural(_) => None,
        }
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(match self.family() {
            ModelFamily::Neural => "Neural",
            ModelFamily::Classical => "Classical",
        })
        .field(&self.name())
        .finish()
    }
}
