use provenance_core::{Error, Result};
use serde::Deserialize;

/// Binomial generalized linear model: `p1 = sigmoid(intercept + beta . x)`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.coefficients.len() != width {
            return Err(Error::config(format!(
                "linear model has {} coefficients for {} inputs",
                self.coefficients.len(),
                width
            )));
        }
        Ok(())
    }

    pub fn margin(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(beta, x)| beta * x)
                .sum::<f64>()
    }

    /// Absolute coefficient per input, used to rank features
    pub fn magnitudes(&self) -> Vec<f64> {
        self.coefficients.iter().map(|beta| beta.abs()).collect()
    }
}
