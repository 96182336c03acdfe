//! Shared feature path for the classical models
//!
//! A [`TextVectorizer`] (TF-IDF in production) turns text into its learned
//! columns. The registry pairs it with a [`FeatureSchema`] derived from the
//! classical models, and the resulting [`FeatureExtractor`] emits
//! [`FeatureVector`]s whose column order matches that schema.

mod extractor;
mod schema;
mod tfidf;

pub use extractor::FeatureExtractor;
pub use schema::{Alignment, FeatureSchema, SchemaKind};
pub use tfidf::{Norm, TextVectorizer, TfidfVectorizer};

use provenance_core::{Error, Result};
use std::sync::Arc;

/// Fixed-width numeric representation of one text, tied to its schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Create a vector; its width must equal the schema width
    pub fn new(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.width() {
            return Err(Error::schema_mismatch(format!(
                "feature vector has {} values but schema {} expects {}",
                values.len(),
                schema.short_fingerprint(),
                schema.width()
            )));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values at the given schema positions, in that order
    pub fn gather(&self, columns: &[usize]) -> Vec<f64> {
        columns.iter().map(|&idx| self.values[idx]).collect()
    }
}
