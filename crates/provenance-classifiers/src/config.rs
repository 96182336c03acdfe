//! Configuration for the ensemble and artifact loading

use provenance_core::{Error, ModelFamily, ModelId, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for all five models and the feature extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Base directory; relative artifact paths resolve against it
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Device for the neural models
    #[serde(default)]
    pub device: DeviceSpec,

    /// Neural truncation window in tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Shared TF-IDF extractor
    #[serde(default = "default_feature_extractor")]
    pub feature_extractor: ArtifactSpec,

    /// Per-model sources
    #[serde(default)]
    pub models: ModelsSpec,

    /// Classical model whose ranked feature list defines the schema
    #[serde(default = "default_schema_reference")]
    pub schema_reference: ModelId,
}

/// Sources of the five ensemble members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsSpec {
    #[serde(default = "default_bert")]
    pub bert: NeuralModelSpec,

    #[serde(default = "default_roberta")]
    pub roberta: NeuralModelSpec,

    #[serde(default = "default_drf")]
    pub drf: ArtifactSpec,

    #[serde(default = "default_gbm")]
    pub gbm: ArtifactSpec,

    #[serde(default = "default_glm")]
    pub glm: ArtifactSpec,
}

/// A file artifact on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub path: PathBuf,
}

impl ArtifactSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Neural sequence classifier specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuralModelSpec {
    /// Where the tokenizer and weights come from
    pub source: NeuralSource,

    /// Backbone architecture of the checkpoint
    pub architecture: NeuralArchitecture,
}

/// Model source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NeuralSource {
    /// Directory holding `config.json`, `tokenizer.json` and `model.safetensors`
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeuralArchitecture {
    Bert,
    Roberta,
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    /// First CUDA device
    Cuda,
    /// Apple Metal (MPS)
    Metal,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_max_length() -> usize {
    512
}

fn default_schema_reference() -> ModelId {
    ModelId::Drf
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_feature_extractor() -> ArtifactSpec {
    ArtifactSpec::new("tfidf_vectorizer.json")
}

fn local_neural(path: &str, architecture: NeuralArchitecture) -> NeuralModelSpec {
    NeuralModelSpec {
        source: NeuralSource::Local {
            path: PathBuf::from(path),
        },
        architecture,
    }
}

fn default_bert() -> NeuralModelSpec {
    local_neural("bert_model", NeuralArchitecture::Bert)
}

fn default_roberta() -> NeuralModelSpec {
    local_neural("roberta_model", NeuralArchitecture::Roberta)
}

fn default_drf() -> ArtifactSpec {
    ArtifactSpec::new("drf_model.json")
}

fn default_gbm() -> ArtifactSpec {
    ArtifactSpec::new("gbm_model.json")
}

fn default_glm() -> ArtifactSpec {
    ArtifactSpec::new("glm_model.json")
}

impl Default for ModelsSpec {
    fn default() -> Self {
        Self {
            bert: default_bert(),
            roberta: default_roberta(),
            drf: default_drf(),
            gbm: default_gbm(),
            glm: default_glm(),
        }
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            device: DeviceSpec::default(),
            max_length: default_max_length(),
            feature_extractor: default_feature_extractor(),
            models: ModelsSpec::default(),
            schema_reference: default_schema_reference(),
        }
    }
}

impl EnsembleConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse ensemble config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read ensemble config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(Error::config("max_length must be positive"));
        }
        if self.schema_reference.family() != ModelFamily::Classical {
            return Err(Error::config(format!(
                "schema_reference must be a classical model, got {}",
                self.schema_reference
            )));
        }
        Ok(())
    }

    /// Resolve a configured path against `models_dir`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.models_dir.join(path)
        }
    }

    /// Resolved path of the TF-IDF artifact
    pub fn feature_extractor_path(&self) -> PathBuf {
        self.resolve_path(&self.feature_extractor.path)
    }

    /// Spec of a neural ensemble member
    pub fn neural_spec(&self, id: ModelId) -> Result<&NeuralModelSpec> {
        match id {
            ModelId::Bert => Ok(&self.models.bert),
            ModelId::Roberta => Ok(&self.models.roberta),
            other => Err(Error::config(format!("{} is not a neural model", other))),
        }
    }

    /// Resolved artifact path of a classical ensemble member
    pub fn classical_path(&self, id: ModelId) -> Result<PathBuf> {
        let spec = match id {
            ModelId::Drf => &self.models.drf,
            ModelId::Gbm => &self.models.gbm,
            ModelId::Glm => &self.models.glm,
            other => return Err(Error::config(format!("{} is not a classical model", other))),
        };
        Ok(self.resolve_path(&spec.path))
    }
}
