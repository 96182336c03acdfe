//! Human-readable rendering of an ensemble result for the CLI

use provenance_classifiers::EnsembleResult;
use provenance_core::ModelId;
use std::fmt;

const RULE_WIDTH: usize = 70;
const PREVIEW_CHARS: usize = 200;

fn model_title(id: ModelId) -> &'static str {
    match id {
        ModelId::Bert => "BERT",
        ModelId::Roberta => "RoBERTa",
        ModelId::Drf => "DRF (Distributed Random Forest)",
        ModelId::Gbm => "GBM (Gradient Boosting Machine)",
        ModelId::Glm => "GLM (Generalized Linear Model)",
    }
}

/// First `PREVIEW_CHARS` characters of `text`, marked when cut
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Per-model table followed by the majority verdict
pub struct TextReport<'a> {
    text: &'a str,
    result: &'a EnsembleResult,
}

impl<'a> TextReport<'a> {
    pub fn new(text: &'a str, result: &'a EnsembleResult) -> Self {
        Self { text, result }
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "{}", heavy)?;
        writeln!(f, "HUMAN OR AI PREDICTION RESULTS")?;
        writeln!(f, "{}", heavy)?;
        writeln!(f, "\nInput text preview: {}\n", preview(self.text))?;
        writeln!(f, "{}", light)?;

        for (idx, vote) in self.result.votes().iter().enumerate() {
            let label = vote.result.label;
            writeln!(f, "\n{}. {}:", idx + 1, model_title(vote.model))?;
            writeln!(f, "   Prediction: {} ({})", label, label.as_index())?;
            writeln!(f, "   Confidence: {:.2}%", vote.result.confidence_percent())?;
        }

        let verdict = self.result.verdict();
        writeln!(f, "\n{}", heavy)?;
        writeln!(f, "ENSEMBLE PREDICTION (Majority Vote):")?;
        writeln!(
            f,
            "   Final Prediction: {} ({})",
            verdict.label,
            verdict.label.as_index()
        )?;
        writeln!(f, "   Average Confidence: {:.2}%", verdict.confidence)?;
        writeln!(
            f,
            "   Vote Count: {} out of {} models predicted HUMAN",
            verdict.vote_count, verdict.total_models
        )?;
        writeln!(f, "{}", heavy)
    }
}

/// Render the report to a string
pub fn render(text: &str, result: &EnsembleResult) -> String {
    TextReport::new(text, result).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_classifiers::{aggregate, ModelVote};
    use provenance_core::{ClassificationResult, Label};

    fn result() -> EnsembleResult {
        let labels = [Label::Human, Label::Ai, Label::Human, Label::Human, Label::Ai];
        let votes = ModelId::ALL
            .iter()
            .zip(labels)
            .map(|(&id, label)| ModelVote::new(id, ClassificationResult::new(label, 0.75)))
            .collect();
        aggregate(votes).unwrap()
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("short"), "short");

        let long = "x".repeat(250);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_render_lists_models_in_order() {
        let text = render("Some text", &result());

        let positions: Vec<usize> = ModelId::ALL
            .iter()
            .map(|&id| text.find(model_title(id)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        assert!(text.contains("Final Prediction: HUMAN (1)"));
        assert!(text.contains("Vote Count: 3 out of 5 models predicted HUMAN"));
        assert!(text.contains("Confidence: 75.00%"));
    }
}
