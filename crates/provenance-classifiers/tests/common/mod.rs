//! Mock collaborators for registry and orchestrator tests
//!
//! Every mock counts its calls so tests can assert load-once and
//! transform-once behavior.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use provenance_classifiers::{
    FeatureClassifier, FeatureImportance, FeatureVector, ModelLoader, TextClassifier,
    TextVectorizer,
};
use provenance_core::{ClassificationResult, Error, Label, ModelId, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Vocabulary of the mock vectorizer
pub const VOCABULARY: [&str; 4] = ["delve", "the", "tapestry", "zebra"];

/// Columns the mock classical models are trained on
pub const MODEL_COLUMNS: [&str; 3] = ["tapestry", "delve", "the"];

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Word-count vectorizer that records how often it ran
pub struct CountingVectorizer {
    names: Vec<String>,
    calls: AtomicU32,
}

impl CountingVectorizer {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            names: strings(vocabulary),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextVectorizer for CountingVectorizer {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn transform(&self, text: &str) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lowered = text.to_lowercase();
        Ok(self
            .names
            .iter()
            .map(|name| lowered.split_whitespace().filter(|w| w == name).count() as f64)
            .collect())
    }
}

/// Neural stand-in returning a fixed result
pub struct MockTextClassifier {
    name: String,
    result: ClassificationResult,
    error: Option<String>,
    calls: AtomicU32,
}

impl MockTextClassifier {
    pub fn new(name: &str, label: Label, confidence: f64) -> Self {
        Self {
            name: name.to_string(),
            result: ClassificationResult::new(label, confidence),
            error: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail every prediction with this message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for MockTextClassifier {
    async fn predict(&self, _text: &str) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(Error::inference(message.clone())),
            None => Ok(self.result),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Classical stand-in returning a fixed result.
///
/// Records the address of every feature buffer it receives, so tests can
/// check that all classical models saw the same vector.
pub struct MockFeatureClassifier {
    name: String,
    columns: Vec<String>,
    importance: Option<Vec<FeatureImportance>>,
    result: ClassificationResult,
    error: Option<String>,
    mismatch: Option<String>,
    calls: AtomicU32,
    seen: Mutex<Vec<usize>>,
}

impl MockFeatureClassifier {
    pub fn new(name: &str, label: Label, confidence: f64) -> Self {
        let columns = strings(&MODEL_COLUMNS);
        let importance = columns
            .iter()
            .enumerate()
            .map(|(rank, column)| FeatureImportance::new(column.clone(), 1.0 / (rank + 1) as f64))
            .collect();
        Self {
            name: name.to_string(),
            columns,
            importance: Some(importance),
            result: ClassificationResult::new(label, confidence),
            error: None,
            mismatch: None,
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = strings(columns);
        self
    }

    pub fn with_importance(mut self, importance: Option<Vec<FeatureImportance>>) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Reject every feature vector as incompatible with this model
    pub fn with_mismatch(mut self, message: &str) -> Self {
        self.mismatch = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_buffers(&self) -> Vec<usize> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl FeatureClassifier for MockFeatureClassifier {
    async fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(features.values().as_ptr() as usize);

        features.schema().resolve(&self.columns)?;
        if let Some(message) = &self.mismatch {
            return Err(Error::schema_mismatch(message.clone()));
        }
        match &self.error {
            Some(message) => Err(Error::inference(message.clone())),
            None => Ok(self.result),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.columns
    }

    fn feature_importance(&self) -> Option<Vec<FeatureImportance>> {
        self.importance.clone()
    }
}

/// Loader over mock models that counts loads per component
pub struct MockLoader {
    pub vectorizer: Arc<CountingVectorizer>,
    pub neural: HashMap<ModelId, Arc<MockTextClassifier>>,
    pub classical: HashMap<ModelId, Arc<MockFeatureClassifier>>,
    loads: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u32>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockLoader {
    /// Five models with the given labels and confidences, in reporting order
    pub fn new(labels: [Label; 5], confidences: [f64; 5]) -> Self {
        let mut neural = HashMap::new();
        let mut classical = HashMap::new();
        for (idx, id) in ModelId::ALL.into_iter().enumerate() {
            match id {
                ModelId::Bert | ModelId::Roberta => {
                    neural.insert(
                        id,
                        Arc::new(MockTextClassifier::new(id.as_str(), labels[idx], confidences[idx])),
                    );
                }
                _ => {
                    classical.insert(
                        id,
                        Arc::new(MockFeatureClassifier::new(
                            id.as_str(),
                            labels[idx],
                            confidences[idx],
                        )),
                    );
                }
            }
        }

        Self {
            vectorizer: Arc::new(CountingVectorizer::new(&VOCABULARY)),
            neural,
            classical,
            loads: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gate: None,
        }
    }

    /// All five models vote HUMAN with 0.9
    pub fn unanimous() -> Self {
        Self::new([Label::Human; 5], [0.9; 5])
    }

    pub fn with_text_model(mut self, id: ModelId, model: MockTextClassifier) -> Self {
        self.neural.insert(id, Arc::new(model));
        self
    }

    pub fn with_feature_model(mut self, id: ModelId, model: MockFeatureClassifier) -> Self {
        self.classical.insert(id, Arc::new(model));
        self
    }

    pub fn with_vectorizer(mut self, vocabulary: &[&str]) -> Self {
        self.vectorizer = Arc::new(CountingVectorizer::new(vocabulary));
        self
    }

    /// Block vectorizer loading until the semaphore hands out a permit
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fail the next `times` loads of `component`
    pub fn fail_next(&self, component: &str, times: u32) {
        self.failures.lock().insert(component.to_string(), times);
    }

    pub fn load_count(&self, component: &str) -> usize {
        self.loads.lock().iter().filter(|c| *c == component).count()
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }

    fn record(&self, component: &str) -> Result<()> {
        self.loads.lock().push(component.to_string());

        let mut failures = self.failures.lock();
        if let Some(remaining) = failures.get_mut(component) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::config(format!("{} artifact is corrupt", component)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load_vectorizer(&self) -> Result<Arc<dyn TextVectorizer>> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| Error::internal(e.to_string()))?;
        }
        self.record("vectorizer")?;
        Ok(self.vectorizer.clone())
    }

    async fn load_neural(&self, id: ModelId) -> Result<Arc<dyn TextClassifier>> {
        self.record(id.as_str())?;
        let model = self
            .neural
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::config(format!("no mock for {}", id)))?;
        Ok(model)
    }

    async fn load_classical(&self, id: ModelId) -> Result<Arc<dyn FeatureClassifier>> {
        self.record(id.as_str())?;
        let model = self
            .classical
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::config(format!("no mock for {}", id)))?;
        Ok(model)
    }
}
