//! Model loading capabilities used by the registry

use crate::classical::ClassicalClassifier;
use crate::classifier::{FeatureClassifier, TextClassifier};
use crate::config::EnsembleConfig;
use crate::features::{TextVectorizer, TfidfVectorizer};
use async_trait::async_trait;
use provenance_core::{Error, ModelFamily, ModelId, Result};
use std::sync::Arc;

/// Backend that produces the five classifiers and the feature vectorizer.
///
/// The registry calls each method at most once per successful
/// initialization. Implementations may block; [`ArtifactLoader`] moves
/// file and weight loading onto the blocking pool.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the shared text vectorizer of the classical family
    async fn load_vectorizer(&self) -> Result<Arc<dyn TextVectorizer>>;

    /// Load a neural ensemble member
    async fn load_neural(&self, id: ModelId) -> Result<Arc<dyn TextClassifier>>;

    /// Load a classical ensemble member
    async fn load_classical(&self, id: ModelId) -> Result<Arc<dyn FeatureClassifier>>;
}

/// Loads artifacts from disk (or the HuggingFace Hub) as configured
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    config: Arc<EnsembleConfig>,
}

impl ArtifactLoader {
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::internal(format!("Loader task failed: {}", e)))?
}

fn expect_family(id: ModelId, family: ModelFamily) -> Result<()> {
    if id.family() == family {
        Ok(())
    } else {
        Err(Error::config(format!(
            "{} is a {:?} model, not {:?}",
            id,
            id.family(),
            family
        )))
    }
}

#[async_trait]
impl ModelLoader for ArtifactLoader {
    async fn load_vectorizer(&self) -> Result<Arc<dyn TextVectorizer>> {
        let path = self.config.feature_extractor_path();
        let vectorizer = blocking(move || TfidfVectorizer::from_file(path)).await?;
        Ok(Arc::new(vectorizer))
    }

    #[cfg(feature = "ml-models")]
    async fn load_neural(&self, id: ModelId) -> Result<Arc<dyn TextClassifier>> {
        use crate::config::{NeuralArchitecture, NeuralSource};
        use crate::neural::{self, BertSequenceClassifier, RobertaSequenceClassifier};

        expect_family(id, ModelFamily::Neural)?;
        let spec = self.config.neural_spec(id)?.clone();
        let config = self.config.clone();

        blocking(move || {
            let model_path = match &spec.source {
                NeuralSource::Local { path } => {
                    let path = config.resolve_path(path);
                    if !path.exists() {
                        return Err(Error::config(format!(
                            "Model path does not exist: {}",
                            path.display()
                        )));
                    }
                    path
                }
                NeuralSource::HuggingFace { repo, revision } => {
                    neural::download_from_huggingface(repo, revision)?
                }
            };

            let device = neural::select_device(config.device)?;
            let classifier: Arc<dyn TextClassifier> = match spec.architecture {
                NeuralArchitecture::Bert => Arc::new(BertSequenceClassifier::load(
                    id.as_str(),
                    &model_path,
                    &device,
                    config.max_length,
                )?),
                NeuralArchitecture::Roberta => Arc::new(RobertaSequenceClassifier::load(
                    id.as_str(),
                    &model_path,
                    &device,
                    config.max_length,
                )?),
            };
            Ok(classifier)
        })
        .await
    }

    #[cfg(not(feature = "ml-models"))]
    async fn load_neural(&self, id: ModelId) -> Result<Arc<dyn TextClassifier>> {
        expect_family(id, ModelFamily::Neural)?;
        Err(Error::config(format!(
            "{} requires the ml-models feature",
            id
        )))
    }

    async fn load_classical(&self, id: ModelId) -> Result<Arc<dyn FeatureClassifier>> {
        expect_family(id, ModelFamily::Classical)?;
        let path = self.config.classical_path(id)?;
        let classifier = blocking(move || ClassicalClassifier::from_file(id.as_str(), path)).await?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn loader_in(dir: PathBuf) -> ArtifactLoader {
        ArtifactLoader::new(EnsembleConfig {
            models_dir: dir,
            ..EnsembleConfig::default()
        })
    }

    #[tokio::test]
    async fn test_loads_classical_artifact_from_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("glm_model.json"),
            r#"{"algorithm": "linear", "feature_names": ["a"], "coefficients": [1.0]}"#,
        )
        .unwrap();

        let loader = loader_in(dir.path().to_path_buf());
        let glm = loader.load_classical(ModelId::Glm).await.unwrap();
        assert_eq!(glm.name(), "GLM");
        assert_eq!(glm.feature_names(), &["a".to_string()]);
    }

    #[tokio::test]
    async fn test_loads_vectorizer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tfidf_vectorizer.json"),
            r#"{"vocabulary": {"delve": 0}, "idf": [1.0]}"#,
        )
        .unwrap();

        let vectorizer = loader_in(dir.path().to_path_buf())
            .load_vectorizer()
            .await
            .unwrap();
        assert_eq!(vectorizer.feature_names(), &["delve".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_artifact_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader_in(dir.path().to_path_buf())
            .load_classical(ModelId::Drf)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[tokio::test]
    async fn test_family_is_checked() {
        let loader = ArtifactLoader::new(EnsembleConfig::default());
        assert!(loader.load_classical(ModelId::Bert).await.is_err());
        assert!(loader.load_neural(ModelId::Gbm).await.is_err());
    }
}
