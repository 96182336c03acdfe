//! Server configuration

use anyhow::Context;
use provenance_classifiers::EnsembleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the ensemble configuration (model artifacts, device)
    #[serde(default)]
    pub ensemble: Option<PathBuf>,

    /// Load all models before accepting requests
    #[serde(default)]
    pub preload: bool,
}

impl ServerConfig {
    /// Load configuration from file, or defaults when the file is absent
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        listen: Option<String>,
        port: Option<u16>,
        ensemble: Option<PathBuf>,
        preload: bool,
    ) -> Self {
        if let Some(listen) = listen {
            self.listen = listen;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if ensemble.is_some() {
            self.ensemble = ensemble;
        }
        self.preload |= preload;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }

    /// Ensemble configuration, or the default artifact layout when unset
    pub fn ensemble_config(&self) -> anyhow::Result<EnsembleConfig> {
        load_ensemble(self.ensemble.as_deref())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            ensemble: None,
            preload: false,
        }
    }
}

/// Load an ensemble configuration file, falling back to defaults
pub fn load_ensemble(path: Option<&Path>) -> anyhow::Result<EnsembleConfig> {
    match path {
        Some(path) => Ok(EnsembleConfig::from_file(path)?),
        None => Ok(EnsembleConfig::default()),
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("/nonexistent/provenance.yaml").unwrap();
        assert_eq!(config.address(), "0.0.0.0:5000");
        assert!(config.ensemble.is_none());
        assert!(!config.preload);
    }

    #[test]
    fn test_yaml_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(&path, "port: 8081\nensemble: ensemble.yaml\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.ensemble, Some(PathBuf::from("ensemble.yaml")));

        let config = config.with_overrides(Some("127.0.0.1".into()), None, None, true);
        assert_eq!(config.address(), "127.0.0.1:8081");
        assert_eq!(config.ensemble, Some(PathBuf::from("ensemble.yaml")));
        assert!(config.preload);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(&path, "port: [not, a, port]\n").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
