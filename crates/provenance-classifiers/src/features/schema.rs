//! Versioned feature schema and vectorizer alignment

use crate::classifier::FeatureImportance;
use provenance_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// How schema columns are identified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Columns are known by name
    Named,
    /// Only the width is known; columns bind by position
    Positional,
}

/// Expected input of the classical models, fixed once at registry init.
///
/// The fingerprint is a SHA-256 over the ordered column names (or the
/// width, for positional schemas) and identifies the schema version.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Columns,
    fingerprint: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Columns {
    Named {
        names: Vec<String>,
        index: HashMap<String, usize>,
    },
    Positional {
        width: usize,
    },
}

impl FeatureSchema {
    /// Schema with named columns in the given order
    pub fn named(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::schema_mismatch("named schema has no columns"));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(Error::schema_mismatch(format!(
                    "duplicate column '{}' in schema",
                    name
                )));
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(b"named\n");
        for name in &names {
            hasher.update(name.as_bytes());
            hasher.update(b"\n");
        }

        Ok(Self {
            columns: Columns::Named { names, index },
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    /// Schema that only knows its width
    pub fn positional(width: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"positional\n");
        hasher.update(width.to_le_bytes());

        Self {
            columns: Columns::Positional { width },
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    /// Derive the schema from a model's ranked feature list.
    ///
    /// Column order follows the ranking. Without a ranked list the schema
    /// falls back to positional columns of `fallback_width`.
    pub fn from_ranked(ranked: Option<Vec<FeatureImportance>>, fallback_width: usize) -> Result<Self> {
        match ranked {
            Some(ranked) if !ranked.is_empty() => {
                Self::named(ranked.into_iter().map(|entry| entry.variable).collect())
            }
            _ => {
                tracing::warn!(
                    width = fallback_width,
                    "No ranked feature list available, binding feature columns by position"
                );
                Ok(Self::positional(fallback_width))
            }
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self.columns {
            Columns::Named { .. } => SchemaKind::Named,
            Columns::Positional { .. } => SchemaKind::Positional,
        }
    }

    pub fn width(&self) -> usize {
        match &self.columns {
            Columns::Named { names, .. } => names.len(),
            Columns::Positional { width } => *width,
        }
    }

    /// Column names, when the schema is named
    pub fn names(&self) -> Option<&[String]> {
        match &self.columns {
            Columns::Named { names, .. } => Some(names),
            Columns::Positional { .. } => None,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First 12 hex digits of the fingerprint, for logs and messages
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..12]
    }

    /// Map a model's input columns to schema positions.
    ///
    /// Named schemas look every column up by name; positional schemas
    /// accept any column list of exactly the schema width.
    pub fn resolve(&self, columns: &[String]) -> Result<Vec<usize>> {
        match &self.columns {
            Columns::Named { index, .. } => {
                let mut missing = Vec::new();
                let mut positions = Vec::with_capacity(columns.len());
                for column in columns {
                    match index.get(column) {
                        Some(&position) => positions.push(position),
                        None => missing.push(column.as_str()),
                    }
                }

                if missing.is_empty() {
                    Ok(positions)
                } else {
                    Err(Error::schema_mismatch(format!(
                        "{} of {} model columns are not in schema {} (first: {})",
                        missing.len(),
                        columns.len(),
                        self.short_fingerprint(),
                        preview(&missing)
                    )))
                }
            }
            Columns::Positional { width } => {
                if columns.len() == *width {
                    Ok((0..*width).collect())
                } else {
                    Err(Error::schema_mismatch(format!(
                        "model expects {} positional columns but schema {} has {}",
                        columns.len(),
                        self.short_fingerprint(),
                        width
                    )))
                }
            }
        }
    }

    /// Align a vectorizer's output columns to this schema.
    ///
    /// Named schemas match columns by name: vocabulary entries outside the
    /// schema are dropped, and a schema column missing from the vocabulary
    /// is a hard error. Positional schemas truncate or zero-pad.
    pub fn align(&self, vocabulary: &[String]) -> Result<Alignment> {
        match &self.columns {
            Columns::Named { names, .. } => {
                let by_name: HashMap<&str, usize> = vocabulary
                    .iter()
                    .enumerate()
                    .map(|(idx, term)| (term.as_str(), idx))
                    .collect();

                let mut missing = Vec::new();
                let sources = names
                    .iter()
                    .map(|name| {
                        let source = by_name.get(name.as_str()).copied();
                        if source.is_none() {
                            missing.push(name.as_str());
                        }
                        source
                    })
                    .collect::<Vec<_>>();

                if !missing.is_empty() {
                    return Err(Error::schema_mismatch(format!(
                        "{} of {} schema columns are not produced by the feature extractor (first: {})",
                        missing.len(),
                        names.len(),
                        preview(&missing)
                    )));
                }

                let used: HashSet<usize> = sources.iter().flatten().copied().collect();
                let dropped = vocabulary.len() - used.len();
                if dropped > 0 {
                    tracing::debug!(dropped, "Extractor columns outside the schema are dropped");
                }

                Ok(Alignment {
                    sources,
                    source_width: vocabulary.len(),
                })
            }
            Columns::Positional { width } => {
                if vocabulary.len() != *width {
                    tracing::warn!(
                        extractor_width = vocabulary.len(),
                        schema_width = width,
                        "Positional alignment will truncate or zero-pad extractor output"
                    );
                }
                Ok(Alignment {
                    sources: (0..*width)
                        .map(|idx| (idx < vocabulary.len()).then_some(idx))
                        .collect(),
                    source_width: vocabulary.len(),
                })
            }
        }
    }
}

fn preview(names: &[&str]) -> String {
    let shown: Vec<_> = names.iter().take(5).copied().collect();
    shown.join(", ")
}

/// Column mapping from vectorizer output to schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Per schema column: the extractor column it reads, or zero
    sources: Vec<Option<usize>>,
    source_width: usize,
}

impl Alignment {
    /// Reorder raw extractor output into schema order
    pub fn apply(&self, raw: &[f64]) -> Result<Vec<f64>> {
        if raw.len() != self.source_width {
            return Err(Error::schema_mismatch(format!(
                "extractor produced {} columns, alignment was built for {}",
                raw.len(),
                self.source_width
            )));
        }

        Ok(self
            .sources
            .iter()
            .map(|source| source.map_or(0.0, |idx| raw[idx]))
            .collect())
    }

    pub fn width(&self) -> usize {
        self.sources.len()
    }

    /// Number of schema columns filled with zero
    pub fn padded(&self) -> usize {
        self.sources.iter().filter(|s| s.is_none()).count()
    }
}
