//! TF-IDF text vectorizer loaded from a fitted artifact

use provenance_core::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Token pattern used when the artifact does not specify one
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Text to fixed learned columns
pub trait TextVectorizer: Send + Sync {
    /// Output column names, indexed by column
    fn feature_names(&self) -> &[String];

    /// Vectorize a single text into `feature_names().len()` values
    fn transform(&self, text: &str) -> Result<Vec<f64>>;
}

/// Row normalization applied after idf weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    L1,
    None,
}

#[derive(Debug, Deserialize)]
struct TfidfArtifact {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default)]
    norm: Norm,
    #[serde(default)]
    token_pattern: Option<String>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// Fitted TF-IDF vectorizer.
///
/// Term counts are weighted by the stored idf, optionally log-scaled
/// (`1 + ln(tf)`), then row-normalized. Terms outside the vocabulary
/// are ignored.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    feature_names: Vec<String>,
    idf: Vec<f64>,
    ngram_range: (usize, usize),
    lowercase: bool,
    sublinear_tf: bool,
    norm: Norm,
    token_pattern: Regex,
}

impl TfidfVectorizer {
    /// Build a vectorizer from vocabulary and idf weights with default settings
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self> {
        Self::from_artifact(TfidfArtifact {
            vocabulary,
            idf,
            ngram_range: default_ngram_range(),
            lowercase: true,
            sublinear_tf: false,
            norm: Norm::L2,
            token_pattern: None,
        })
    }

    /// Load a fitted vectorizer from its JSON artifact
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read TF-IDF artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        let vectorizer = Self::from_json(&contents)?;

        debug!(
            path = %path.display(),
            features = vectorizer.feature_names.len(),
            "Loaded TF-IDF vectorizer"
        );
        Ok(vectorizer)
    }

    /// Parse a fitted vectorizer from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: TfidfArtifact = serde_json::from_str(json)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: TfidfArtifact) -> Result<Self> {
        let width = artifact.vocabulary.len();
        if width == 0 {
            return Err(Error::config("TF-IDF vocabulary is empty"));
        }
        if artifact.idf.len() != width {
            return Err(Error::config(format!(
                "TF-IDF artifact has {} idf weights for {} vocabulary terms",
                artifact.idf.len(),
                width
            )));
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::config(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }

        let mut feature_names: Vec<Option<String>> = vec![None; width];
        for (term, &column) in &artifact.vocabulary {
            let slot = feature_names.get_mut(column).ok_or_else(|| {
                Error::config(format!(
                    "vocabulary term '{}' maps to column {} outside 0..{}",
                    term, column, width
                ))
            })?;
            if slot.replace(term.clone()).is_some() {
                return Err(Error::config(format!(
                    "vocabulary column {} is assigned twice",
                    column
                )));
            }
        }
        // Every slot is filled: width distinct columns all below width.
        let feature_names = feature_names.into_iter().flatten().collect();

        let pattern = artifact
            .token_pattern
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_PATTERN);
        let token_pattern = Regex::new(pattern)
            .map_err(|e| Error::config(format!("Invalid token pattern '{}': {}", pattern, e)))?;

        Ok(Self {
            vocabulary: artifact.vocabulary,
            feature_names,
            idf: artifact.idf,
            ngram_range: artifact.ngram_range,
            lowercase: artifact.lowercase,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
            token_pattern,
        })
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.token_pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .collect()
    }

    fn term_counts(&self, text: &str) -> HashMap<usize, f64> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens = self.tokenize(&text);

        let mut counts = HashMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&column) = self.vocabulary.get(&term) {
                    *counts.entry(column).or_insert(0.0) += 1.0;
                }
            }
        }
        counts
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, text: &str) -> Result<Vec<f64>> {
        let mut row = vec![0.0; self.num_features()];
        for (column, count) in self.term_counts(text) {
            let tf = if self.sublinear_tf {
                1.0 + count.ln()
            } else {
                count
            };
            row[column] = tf * self.idf[column];
        }

        let norm = match self.norm {
            Norm::L2 => row.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Norm::L1 => row.iter().map(|v| v.abs()).sum::<f64>(),
            Norm::None => 1.0,
        };
        if norm > 0.0 && norm != 1.0 {
            for value in &mut row {
                *value /= norm;
            }
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> HashMap<String, usize> {
        terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect()
    }

    #[test]
    fn test_feature_names_follow_column_index() {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("zeta".to_string(), 0);
        vocabulary.insert("alpha".to_string(), 1);
        let vectorizer = TfidfVectorizer::new(vocabulary, vec![1.0, 1.0]).unwrap();

        assert_eq!(vectorizer.feature_names(), &["zeta", "alpha"]);
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let vectorizer =
            TfidfVectorizer::new(vocab(&["delve", "into", "tapestry"]), vec![1.0, 1.0, 2.0])
                .unwrap();

        let row = vectorizer.transform("Delve into the rich tapestry").unwrap();
        let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        // tapestry carries twice the idf of the others
        assert!((row[2] - 2.0 * row[0]).abs() < 1e-9);
    }

    #[test]
    fn test_single_char_tokens_and_unknown_terms_ignored() {
        let vectorizer = TfidfVectorizer::new(vocab(&["a", "cat"]), vec![1.0, 1.0]).unwrap();

        let row = vectorizer.transform("a cat sat on a mat").unwrap();
        assert_eq!(row[0], 0.0);
        assert!((row[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_yields_zero_row() {
        let vectorizer = TfidfVectorizer::new(vocab(&["word"]), vec![1.5]).unwrap();
        assert_eq!(vectorizer.transform("").unwrap(), vec![0.0]);
    }

    #[test]
    fn test_artifact_with_bigrams_and_sublinear_tf() {
        let json = r#"{
            "vocabulary": {"rich": 0, "rich tapestry": 1},
            "idf": [1.0, 1.0],
            "ngram_range": [1, 2],
            "sublinear_tf": true,
            "norm": "none"
        }"#;
        let vectorizer = TfidfVectorizer::from_json(json).unwrap();

        let row = vectorizer.transform("rich rich tapestry").unwrap();
        assert!((row[0] - (1.0 + 2.0f64.ln())).abs() < 1e-9);
        assert!((row[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_artifacts_rejected() {
        assert!(TfidfVectorizer::new(vocab(&["a", "b"]), vec![1.0]).is_err());
        assert!(TfidfVectorizer::new(HashMap::new(), Vec::new()).is_err());

        let mut gapped = HashMap::new();
        gapped.insert("a".to_string(), 0);
        gapped.insert("b".to_string(), 5);
        assert!(TfidfVectorizer::new(gapped, vec![1.0, 1.0]).is_err());

        let json = r#"{"vocabulary": {"a": 0}, "idf": [1.0], "ngram_range": [2, 1]}"#;
        assert!(TfidfVectorizer::from_json(json).is_err());
    }
}
