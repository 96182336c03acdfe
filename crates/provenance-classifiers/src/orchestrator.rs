//! Drives one text through all five models and the aggregator

use crate::classifier::ModelInput;
use crate::ensemble::{aggregate, EnsembleResult, ModelVote};
use crate::registry::{LoadedModels, ModelRegistry};
use provenance_core::{ClassificationResult, Error, ModelId, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Entry point for analysis requests.
///
/// Models run one after another: BERT and RoBERTa on the raw text, then
/// the feature vector is computed once and shared by DRF, GBM and GLM.
/// Any classifier failure fails the whole call; there are no retries and
/// no substitute votes.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Non-blocking readiness probe
    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Load the models now instead of on the first request
    pub async fn preload(&self) -> Result<()> {
        self.registry.ensure_ready().await.map(|_| ())
    }

    /// Classify `text` with the full ensemble.
    ///
    /// The caller rejects blank text before calling this.
    #[instrument(name = "analyze", skip_all, fields(chars = text.chars().count()))]
    pub async fn analyze(&self, text: &str) -> Result<EnsembleResult> {
        let start = Instant::now();
        let outcome = self.run(text).await;

        metrics::histogram!("provenance_analyze_latency_us")
            .record(start.elapsed().as_micros() as f64);
        match &outcome {
            Ok(result) => {
                metrics::counter!("provenance_analyze_total", "outcome" => "success").increment(1);
                metrics::histogram!("provenance_votes_human")
                    .record(result.verdict().vote_count as f64);
                debug!(
                    label = %result.label(),
                    votes = result.verdict().vote_count,
                    confidence = result.verdict().confidence,
                    "Ensemble verdict"
                );
            }
            Err(e) => {
                metrics::counter!("provenance_analyze_total", "outcome" => e.kind()).increment(1);
            }
        }

        outcome
    }

    async fn run(&self, text: &str) -> Result<EnsembleResult> {
        let models = self.registry.ensure_ready().await?;
        let mut votes = Vec::with_capacity(ModelId::ALL.len());

        for id in ModelId::NEURAL {
            let result = predict(&models, id, ModelInput::Text(text)).await?;
            votes.push(ModelVote::new(id, result));
        }

        let features = models.extractor().transform(text)?;
        for id in ModelId::CLASSICAL {
            let result = predict(&models, id, ModelInput::Features(&features)).await?;
            votes.push(ModelVote::new(id, result));
        }

        aggregate(votes)
    }
}

async fn predict(
    models: &LoadedModels,
    id: ModelId,
    input: ModelInput<'_>,
) -> Result<ClassificationResult> {
    let handle = models
        .get(id)
        .ok_or_else(|| Error::internal(format!("{} is not loaded", id)))?;

    match handle.predict(input).await {
        Ok(result) => {
            debug!(model = %id, label = %result.label, confidence = result.confidence, "Prediction");
            Ok(result)
        }
        Err(e) => {
            metrics::counter!("provenance_classifier_errors_total", "model" => id.as_str())
                .increment(1);
            Err(match e {
                Error::SchemaMismatch(message) => {
                    Error::schema_mismatch(format!("{}: {}", id, message))
                }
                other => Error::classifier(id.as_str(), other),
            })
        }
    }
}
