//! Majority-vote aggregation of the five classifier results
//!
//! The verdict is HUMAN when at least three of the five models vote HUMAN.
//! The ensemble confidence is the plain mean of the five reported
//! confidences, whatever label each one backs. It is a transparency
//! signal, not a calibrated probability.

use provenance_core::types::round2;
use provenance_core::{ClassificationResult, Error, Label, ModelId, Result};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

/// Number of voters in the ensemble
pub const ENSEMBLE_SIZE: usize = 5;

/// Votes needed for a HUMAN verdict
pub const MAJORITY: usize = ENSEMBLE_SIZE / 2 + 1;

/// One model's result, tagged with the model that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelVote {
    pub model: ModelId,
    pub result: ClassificationResult,
}

impl ModelVote {
    pub fn new(model: ModelId, result: ClassificationResult) -> Self {
        Self { model, result }
    }
}

/// Combined decision of the ensemble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleVerdict {
    pub label: Label,

    /// Mean of the per-model confidence percentages, two decimals
    pub confidence: f64,

    /// Models that voted HUMAN
    pub vote_count: usize,

    pub total_models: usize,
}

/// Per-model results in reporting order plus the ensemble verdict
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleResult {
    votes: Vec<ModelVote>,
    verdict: EnsembleVerdict,
}

impl EnsembleResult {
    /// Per-model votes in the order they were aggregated
    pub fn votes(&self) -> &[ModelVote] {
        &self.votes
    }

    pub fn verdict(&self) -> &EnsembleVerdict {
        &self.verdict
    }

    pub fn label(&self) -> Label {
        self.verdict.label
    }

    /// Result of a specific model
    pub fn get(&self, model: ModelId) -> Option<&ClassificationResult> {
        self.votes
            .iter()
            .find(|vote| vote.model == model)
            .map(|vote| &vote.result)
    }
}

/// Aggregate exactly five results into a majority verdict.
///
/// Fails with `IncompleteEnsemble` for any other count; a partial
/// ensemble is never reported as a full one.
pub fn aggregate(votes: Vec<ModelVote>) -> Result<EnsembleResult> {
    if votes.len() != ENSEMBLE_SIZE {
        return Err(Error::IncompleteEnsemble {
            expected: ENSEMBLE_SIZE,
            actual: votes.len(),
        });
    }

    for (idx, vote) in votes.iter().enumerate() {
        if votes[..idx].iter().any(|earlier| earlier.model == vote.model) {
            return Err(Error::internal(format!(
                "{} voted more than once",
                vote.model
            )));
        }
    }

    let vote_count = votes
        .iter()
        .filter(|vote| vote.result.label.is_human())
        .count();
    let label = if vote_count >= MAJORITY {
        Label::Human
    } else {
        Label::Ai
    };

    let total: f64 = votes
        .iter()
        .map(|vote| vote.result.confidence_percent())
        .sum();
    let confidence = round2(total / ENSEMBLE_SIZE as f64);

    Ok(EnsembleResult {
        votes,
        verdict: EnsembleVerdict {
            label,
            confidence,
            vote_count,
            total_models: ENSEMBLE_SIZE,
        },
    })
}

struct IndividualReport<'a>(&'a ClassificationResult);

impl Serialize for IndividualReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("IndividualReport", 3)?;
        report.serialize_field("prediction", &self.0.label.as_index())?;
        report.serialize_field("label", &self.0.label)?;
        report.serialize_field("confidence", &self.0.confidence_percent())?;
        report.end()
    }
}

struct IndividualResults<'a>(&'a [ModelVote]);

impl Serialize for IndividualResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for vote in self.0 {
            map.serialize_entry(vote.model.as_str(), &IndividualReport(&vote.result))?;
        }
        map.end()
    }
}

impl Serialize for EnsembleVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut verdict = serializer.serialize_struct("EnsembleVerdict", 5)?;
        verdict.serialize_field("prediction", &self.label.as_index())?;
        verdict.serialize_field("label", &self.label)?;
        verdict.serialize_field("confidence", &self.confidence)?;
        verdict.serialize_field("vote_count", &self.vote_count)?;
        verdict.serialize_field("total_models", &self.total_models)?;
        verdict.end()
    }
}

impl Serialize for EnsembleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("EnsembleResult", 2)?;
        report.serialize_field("individual_results", &IndividualResults(&self.votes))?;
        report.serialize_field("ensemble", &self.verdict)?;
        report.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn votes(labels: [Label; 5], confidences: [f64; 5]) -> Vec<ModelVote> {
        ModelId::ALL
            .iter()
            .zip(labels.iter().zip(confidences.iter()))
            .map(|(&model, (&label, &confidence))| {
                ModelVote::new(model, ClassificationResult::new(label, confidence))
            })
            .collect()
    }

    const H: Label = Label::Human;
    const A: Label = Label::Ai;

    #[test]
    fn test_unanimous_human() {
        let result = aggregate(votes([H; 5], [0.855, 0.902, 0.8, 0.8, 0.8])).unwrap();

        assert_eq!(result.verdict().vote_count, 5);
        assert_eq!(result.label(), Label::Human);
        assert_eq!(result.verdict().confidence, 83.14);
        assert_eq!(result.verdict().total_models, 5);
    }

    #[test]
    fn test_three_of_five_is_majority() {
        let result = aggregate(votes([H, A, H, H, A], [0.75, 0.65, 0.7, 0.7, 0.6])).unwrap();

        assert_eq!(result.verdict().vote_count, 3);
        assert_eq!(result.label(), Label::Human);
        assert_eq!(result.verdict().confidence, 68.0);
    }

    #[test]
    fn test_two_of_five_is_ai() {
        let result = aggregate(votes([H, A, A, A, H], [0.6; 5])).unwrap();

        assert_eq!(result.verdict().vote_count, 2);
        assert_eq!(result.label(), Label::Ai);
    }

    #[test]
    fn test_all_ai_averages_ai_confidences() {
        let result = aggregate(votes([A; 5], [0.9, 0.8, 0.7, 0.6, 0.5])).unwrap();

        assert_eq!(result.verdict().vote_count, 0);
        assert_eq!(result.label(), Label::Ai);
        assert_eq!(result.verdict().confidence, 70.0);
    }

    #[test]
    fn test_partial_ensemble_rejected() {
        let mut partial = votes([H; 5], [0.9; 5]);
        partial.pop();

        let err = aggregate(partial).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteEnsemble {
                expected: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_duplicate_voter_rejected() {
        let mut duplicated = votes([H; 5], [0.9; 5]);
        duplicated[4].model = ModelId::Bert;
        assert!(aggregate(duplicated).is_err());
    }

    #[test]
    fn test_report_shape_and_order() {
        let result = aggregate(votes([H, A, H, H, A], [0.75, 0.65, 0.7, 0.7, 0.6])).unwrap();
        let json = serde_json::to_string(&result).unwrap();

        assert!(json.starts_with(
            r#"{"individual_results":{"BERT":{"prediction":1,"label":"HUMAN","confidence":75.0},"RoBERTa":{"prediction":0,"label":"AI","confidence":65.0}"#
        ));
        assert!(json.ends_with(
            r#""ensemble":{"prediction":1,"label":"HUMAN","confidence":68.0,"vote_count":3,"total_models":5}}"#
        ));

        let order: Vec<_> = ["BERT", "RoBERTa", "DRF", "GBM", "GLM"]
            .iter()
            .map(|name| json.find(&format!("\"{}\"", name)).unwrap())
            .collect();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    }

    fn label_strategy() -> impl Strategy<Value = Label> {
        prop_oneof![Just(Label::Human), Just(Label::Ai)]
    }

    proptest! {
        #[test]
        fn prop_majority_rule(
            labels in prop::array::uniform5(label_strategy()),
            confidences in prop::array::uniform5(0.0f64..=1.0),
        ) {
            let result = aggregate(votes(labels, confidences)).unwrap();
            let humans = labels.iter().filter(|l| l.is_human()).count();

            prop_assert_eq!(result.verdict().vote_count, humans);
            prop_assert_eq!(result.label() == Label::Human, humans >= 3);
            prop_assert_eq!(result.label() == Label::Ai, humans <= 2);
        }

        #[test]
        fn prop_confidence_is_label_blind_mean(
            labels in prop::array::uniform5(label_strategy()),
            confidences in prop::array::uniform5(0.0f64..=1.0),
        ) {
            let result = aggregate(votes(labels, confidences)).unwrap();
            let mean = confidences.iter().sum::<f64>() / 5.0 * 100.0;

            // per-model and final rounding each move the value by at most 0.005
            prop_assert!((result.verdict().confidence - mean).abs() <= 0.0101);

            let flipped = labels.map(|l| if l.is_human() { Label::Ai } else { Label::Human });
            let other = aggregate(votes(flipped, confidences)).unwrap();
            prop_assert_eq!(other.verdict().confidence, result.verdict().confidence);
        }
    }
}
