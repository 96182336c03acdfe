//! Provenance Classifiers
//!
//! Prediction orchestration for the human-vs-machine authorship ensemble.
//!
//! Five independently trained classifiers vote on every text:
//! - Two neural sequence classifiers (BERT, RoBERTa) read the raw text
//! - Three classical models (DRF, GBM, GLM) read one shared TF-IDF feature
//!   vector, computed once per request and aligned to a named schema
//!
//! The [`ModelRegistry`] loads everything lazily and exactly once, the
//! [`Orchestrator`] drives one request through all five models, and
//! [`ensemble::aggregate`] turns the five results into a majority verdict.

pub mod classical;
pub mod classifier;
pub mod config;
pub mod ensemble;
pub mod features;
pub mod loader;
#[cfg(feature = "ml-models")]
pub mod neural;
pub mod orchestrator;
pub mod registry;

pub use classical::ClassicalClassifier;
pub use classifier::{FeatureClassifier, FeatureImportance, ModelHandle, ModelInput, TextClassifier};
pub use config::{DeviceSpec, EnsembleConfig, NeuralArchitecture, NeuralModelSpec, NeuralSource};
pub use ensemble::{aggregate, EnsembleResult, EnsembleVerdict, ModelVote, ENSEMBLE_SIZE};
pub use features::{
    Alignment, FeatureExtractor, FeatureSchema, FeatureVector, SchemaKind, TextVectorizer,
    TfidfVectorizer,
};
pub use loader::{ArtifactLoader, ModelLoader};
pub use orchestrator::Orchestrator;
pub use registry::{LoadedModels, ModelRegistry, RegistryPhase};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{FeatureClassifier, ModelHandle, TextClassifier};
    pub use crate::ensemble::{aggregate, EnsembleResult};
    pub use crate::features::{FeatureExtractor, FeatureSchema, FeatureVector};
    pub use crate::loader::{ArtifactLoader, ModelLoader};
    pub use crate::orchestrator::Orchestrator;
    pub use crate::registry::ModelRegistry;
    pub use provenance_core::{ClassificationResult, Error, Label, ModelId, Result};
}
