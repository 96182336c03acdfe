//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use provenance_classifiers::{ModelRegistry, Orchestrator};
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Ensemble entry point; models load on first use
    pub orchestrator: Orchestrator,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, metrics_handle: PrometheusHandle) -> Self {
        Self {
            orchestrator,
            metrics_handle,
        }
    }

    /// Build state from configuration, loading models now when `preload` is set
    pub async fn from_config(
        config: &ServerConfig,
        metrics_handle: PrometheusHandle,
    ) -> anyhow::Result<Self> {
        let ensemble = config.ensemble_config()?;
        info!(
            models_dir = %ensemble.models_dir.display(),
            device = ?ensemble.device,
            "Ensemble configured"
        );

        let registry = Arc::new(ModelRegistry::from_config(ensemble));
        let orchestrator = Orchestrator::new(registry);

        if config.preload {
            info!("Preloading models...");
            orchestrator.preload().await?;
        } else {
            info!("Models will load on the first request");
        }

        Ok(Self::new(orchestrator, metrics_handle))
    }
}
