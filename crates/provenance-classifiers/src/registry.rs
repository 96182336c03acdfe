//! Lazy, exactly-once loading of the five models and the feature extractor

use crate::classifier::{FeatureClassifier, ModelHandle};
use crate::config::EnsembleConfig;
use crate::features::{FeatureExtractor, FeatureSchema};
use crate::loader::{ArtifactLoader, ModelLoader};
use parking_lot::RwLock;
use provenance_core::{Error, ModelId, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle of the registry.
///
/// `Uninitialized -> Initializing -> Ready`; a failed initialization
/// falls back to `Uninitialized`. `Ready` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryPhase {
    Uninitialized,
    Initializing,
    Ready,
}

impl RegistryPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        }
    }
}

/// Everything the registry loaded, read-only once published
pub struct LoadedModels {
    models: Vec<(ModelId, ModelHandle)>,
    extractor: FeatureExtractor,
}

impl LoadedModels {
    /// Handle of an ensemble member
    pub fn get(&self, id: ModelId) -> Option<&ModelHandle> {
        self.models
            .iter()
            .find(|(model, _)| *model == id)
            .map(|(_, handle)| handle)
    }

    /// Handles in reporting order
    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &ModelHandle)> {
        self.models.iter().map(|(id, handle)| (*id, handle))
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        self.extractor.schema()
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models
            .iter()
            .map(|(_, handle)| handle.name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for LoadedModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModels")
            .field("models", &self.models)
            .field("extractor", &self.extractor)
            .finish()
    }
}

enum RegistryState {
    Uninitialized,
    Initializing,
    Ready(Arc<LoadedModels>),
}

impl RegistryState {
    fn phase(&self) -> RegistryPhase {
        match self {
            Self::Uninitialized => RegistryPhase::Uninitialized,
            Self::Initializing => RegistryPhase::Initializing,
            Self::Ready(_) => RegistryPhase::Ready,
        }
    }
}

/// Resets an interrupted initialization back to `Uninitialized`
struct InitializingGuard<'a> {
    state: &'a RwLock<RegistryState>,
    armed: bool,
}

impl<'a> InitializingGuard<'a> {
    fn enter(state: &'a RwLock<RegistryState>) -> Self {
        *state.write() = RegistryState::Initializing;
        Self { state, armed: true }
    }

    fn publish(mut self, models: Arc<LoadedModels>) {
        *self.state.write() = RegistryState::Ready(models);
        self.armed = false;
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.write() = RegistryState::Uninitialized;
        }
    }
}

/// Owner of the five ensemble members and the shared feature extractor.
///
/// Nothing is loaded until the first [`ensure_ready`](Self::ensure_ready).
/// Concurrent first calls load once: the first caller loads, the others
/// wait on the init lock and then observe `Ready`.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    schema_reference: ModelId,
    state: RwLock<RegistryState>,
    init_lock: tokio::sync::Mutex<()>,
}

impl ModelRegistry {
    /// Create an uninitialized registry over `loader`
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            schema_reference: ModelId::Drf,
            state: RwLock::new(RegistryState::Uninitialized),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Registry that loads artifacts as described by `config`
    pub fn from_config(config: EnsembleConfig) -> Self {
        let schema_reference = config.schema_reference;
        Self::new(Arc::new(ArtifactLoader::new(config))).with_schema_reference(schema_reference)
    }

    /// Classical model whose ranked feature list defines the schema
    pub fn with_schema_reference(mut self, id: ModelId) -> Self {
        self.schema_reference = id;
        self
    }

    pub fn phase(&self) -> RegistryPhase {
        self.state.read().phase()
    }

    /// Non-blocking readiness check
    pub fn is_ready(&self) -> bool {
        self.phase() == RegistryPhase::Ready
    }

    /// Loaded models, if initialization has completed
    pub fn loaded(&self) -> Option<Arc<LoadedModels>> {
        match &*self.state.read() {
            RegistryState::Ready(models) => Some(models.clone()),
            _ => None,
        }
    }

    /// Active feature schema once ready
    pub fn schema(&self) -> Option<Arc<FeatureSchema>> {
        self.loaded().map(|models| models.schema().clone())
    }

    /// Names of the loaded models in reporting order; empty until ready
    pub fn model_names(&self) -> Vec<String> {
        self.loaded()
            .map(|models| models.model_names())
            .unwrap_or_default()
    }

    /// Handle of an ensemble member once ready
    pub fn get(&self, id: ModelId) -> Option<ModelHandle> {
        self.loaded().and_then(|models| models.get(id).cloned())
    }

    /// Load everything on first call; later calls return the loaded set.
    ///
    /// Any component failing to load fails the whole initialization with
    /// `Error::Initialization` naming it, and the registry returns to
    /// `Uninitialized`.
    pub async fn ensure_ready(&self) -> Result<Arc<LoadedModels>> {
        if let Some(models) = self.loaded() {
            return Ok(models);
        }

        let _init = self.init_lock.lock().await;
        if let Some(models) = self.loaded() {
            return Ok(models);
        }

        let guard = InitializingGuard::enter(&self.state);
        let start = Instant::now();
        info!("Initializing model registry");

        match self.load_all().await {
            Ok(models) => {
                let models = Arc::new(models);
                info!(
                    models = ?models.model_names(),
                    schema = models.schema().short_fingerprint(),
                    width = models.schema().width(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model registry ready"
                );
                metrics::counter!("provenance_registry_initializations_total", "outcome" => "success")
                    .increment(1);
                guard.publish(models.clone());
                Ok(models)
            }
            Err(e) => {
                warn!(error = %e, "Model registry initialization failed");
                metrics::counter!("provenance_registry_initializations_total", "outcome" => "failure")
                    .increment(1);
                Err(e)
            }
        }
    }

    async fn load_all(&self) -> Result<LoadedModels> {
        let vectorizer = self
            .loader
            .load_vectorizer()
            .await
            .map_err(|e| Error::initialization("feature extractor", e))?;

        let mut models = Vec::with_capacity(ModelId::ALL.len());
        for id in ModelId::NEURAL {
            let handle = self
                .loader
                .load_neural(id)
                .await
                .map_err(|e| Error::initialization(id.as_str(), e))?;
            info!(model = %id, "Loaded neural model");
            models.push((id, ModelHandle::Neural(handle)));
        }

        let mut classical: Vec<(ModelId, Arc<dyn FeatureClassifier>)> = Vec::new();
        for id in ModelId::CLASSICAL {
            let handle = self
                .loader
                .load_classical(id)
                .await
                .map_err(|e| Error::initialization(id.as_str(), e))?;
            info!(model = %id, inputs = handle.feature_names().len(), "Loaded classical model");
            classical.push((id, handle));
        }

        let reference = classical
            .iter()
            .find(|(id, _)| *id == self.schema_reference)
            .map(|(_, handle)| handle)
            .ok_or_else(|| {
                Error::initialization(
                    "feature schema",
                    Error::config(format!(
                        "schema reference {} is not a classical model",
                        self.schema_reference
                    )),
                )
            })?;
        let schema = FeatureSchema::from_ranked(
            reference.feature_importance(),
            reference.feature_names().len(),
        )
        .map_err(|e| Error::initialization("feature schema", e))?;

        for (id, handle) in &classical {
            schema
                .resolve(handle.feature_names())
                .map_err(|e| Error::initialization(id.as_str(), e))?;
        }

        let extractor = FeatureExtractor::new(vectorizer, Arc::new(schema))
            .map_err(|e| Error::initialization("feature extractor", e))?;

        models.extend(
            classical
                .into_iter()
                .map(|(id, handle)| (id, ModelHandle::Classical(handle))),
        );

        Ok(LoadedModels { models, extractor })
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("phase", &self.phase())
            .field("schema_reference", &self.schema_reference)
            .finish()
    }
}
