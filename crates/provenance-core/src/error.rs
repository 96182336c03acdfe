//! Error types for Provenance

/// Result type alias using Provenance's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Provenance operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model or the feature extractor failed to load; fatal to the registry
    #[error("failed to initialize {component}: {source}")]
    Initialization {
        component: String,
        #[source]
        source: Box<Error>,
    },

    /// A specific classifier failed during prediction
    #[error("classifier {model} failed: {source}")]
    Classifier {
        model: String,
        #[source]
        source: Box<Error>,
    },

    /// Feature vector cannot be reconciled with a classical model's input
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Aggregation was asked to vote with the wrong number of results
    #[error("ensemble requires {expected} results, got {actual}")]
    IncompleteEnsemble { expected: usize, actual: usize },

    /// Low-level inference errors (tokenization, tensors, artifacts)
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a load failure of `component` as an initialization error
    pub fn initialization(component: impl Into<String>, source: Error) -> Self {
        Self::Initialization {
            component: component.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a prediction failure of `model` as a classifier error
    pub fn classifier(model: impl Into<String>, source: Error) -> Self {
        Self::Classifier {
            model: model.into(),
            source: Box::new(source),
        }
    }

    /// Create a new schema mismatch error
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable tag identifying the error category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "initialization",
            Self::Classifier { .. } => "classifier",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::IncompleteEnsemble { .. } => "incomplete_ensemble",
            Self::Inference(_) => "inference",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    /// Name of the component or model that failed, if the error carries one
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::Initialization { component, .. } => Some(component),
            Self::Classifier { model, .. } => Some(model),
            _ => None,
        }
    }
}
