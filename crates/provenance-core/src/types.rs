//! Core types for Provenance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary authorship label.
///
/// The numeric convention is fixed system-wide: `1 = HUMAN`, `0 = AI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Human,
    Ai,
}

impl Label {
    /// Numeric class index of this label
    pub fn as_index(self) -> u8 {
        match self {
            Self::Human => 1,
            Self::Ai => 0,
        }
    }

    /// Label for a numeric class index (anything non-zero is HUMAN)
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::Ai
        } else {
            Self::Human
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "HUMAN",
            Self::Ai => "AI",
        }
    }

    pub fn is_human(self) -> bool {
        matches!(self, Self::Human)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single classifier.
///
/// `confidence` is the probability mass assigned to the predicted label,
/// never the raw probability of a fixed class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,

    /// Probability of `label`, in `[0, 1]`
    pub confidence: f64,
}

impl ClassificationResult {
    /// Create a new result, clamping confidence into `[0, 1]`
    pub fn new(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Result from a two-class distribution `[p(AI), p(HUMAN)]`.
    ///
    /// The label is the argmax (ties go to the lower index, AI) and the
    /// confidence is the winning probability.
    pub fn from_probabilities(p_ai: f64, p_human: f64) -> Self {
        if p_human > p_ai {
            Self::new(Label::Human, p_human)
        } else {
            Self::new(Label::Ai, p_ai)
        }
    }

    /// Result from `p(HUMAN)` and a decision threshold on it.
    pub fn from_human_probability(p_human: f64, threshold: f64) -> Self {
        let p_human = p_human.clamp(0.0, 1.0);
        if p_human >= threshold {
            Self::new(Label::Human, p_human)
        } else {
            Self::new(Label::Ai, 1.0 - p_human)
        }
    }

    /// Confidence as a percentage rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        round2(self.confidence * 100.0)
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Model family: decides which input shape a classifier consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Sequence classification over raw text
    Neural,
    /// Tabular model over the shared feature vector
    Classical,
}

/// Identity of one of the five ensemble members.
///
/// Declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    Bert,
    Roberta,
    Drf,
    Gbm,
    Glm,
}

impl ModelId {
    /// All members in reporting order: neural A, neural B, classical 1-3
    pub const ALL: [ModelId; 5] = [
        ModelId::Bert,
        ModelId::Roberta,
        ModelId::Drf,
        ModelId::Gbm,
        ModelId::Glm,
    ];

    pub const NEURAL: [ModelId; 2] = [ModelId::Bert, ModelId::Roberta];

    pub const CLASSICAL: [ModelId; 3] = [ModelId::Drf, ModelId::Gbm, ModelId::Glm];

    /// Name used in reports and error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bert => "BERT",
            Self::Roberta => "RoBERTa",
            Self::Drf => "DRF",
            Self::Gbm => "GBM",
            Self::Glm => "GLM",
        }
    }

    pub fn family(self) -> ModelFamily {
        match self {
            Self::Bert | Self::Roberta => ModelFamily::Neural,
            Self::Drf | Self::Gbm | Self::Glm => ModelFamily::Classical,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bert" => Ok(Self::Bert),
            "roberta" => Ok(Self::Roberta),
            "drf" => Ok(Self::Drf),
            "gbm" => Ok(Self::Gbm),
            "glm" => Ok(Self::Glm),
            other => Err(crate::Error::config(format!("unknown model '{}'", other))),
        }
    }
}
