use super::{Alignment, FeatureSchema, FeatureVector, TextVectorizer};
use provenance_core::Result;
use std::sync::Arc;

/// Vectorizer bound to the registry's feature schema.
///
/// Built once at registry init; `transform` is the only per-request
/// entry point for the classical family.
pub struct FeatureExtractor {
    vectorizer: Arc<dyn TextVectorizer>,
    schema: Arc<FeatureSchema>,
    alignment: Alignment,
}

impl FeatureExtractor {
    /// Bind `vectorizer` to `schema`, failing if the columns cannot be aligned
    pub fn new(vectorizer: Arc<dyn TextVectorizer>, schema: Arc<FeatureSchema>) -> Result<Self> {
        let alignment = schema.align(vectorizer.feature_names())?;

        tracing::info!(
            schema = schema.short_fingerprint(),
            width = schema.width(),
            extractor_width = vectorizer.feature_names().len(),
            padded = alignment.padded(),
            "Feature extractor bound to schema"
        );

        Ok(Self {
            vectorizer,
            schema,
            alignment,
        })
    }

    /// Vectorize `text` into schema order
    pub fn transform(&self, text: &str) -> Result<FeatureVector> {
        let raw = self.vectorizer.transform(text)?;
        let values = self.alignment.apply(&raw)?;
        FeatureVector::new(self.schema.clone(), values)
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("schema", &self.schema.short_fingerprint())
            .field("width", &self.schema.width())
            .finish()
    }
}
