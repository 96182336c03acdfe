//! Provenance Core
//!
//! Core types and error handling shared across Provenance components.
//!
//! This crate provides:
//! - The system-wide label convention (`1 = HUMAN`, `0 = AI`)
//! - Single-classifier results with predicted-class confidence
//! - Identities of the five ensemble members and their model families
//! - The error taxonomy surfaced by the orchestration layer

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ClassificationResult, Label, ModelFamily, ModelId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassificationResult, Label, ModelFamily, ModelId};
}
