//! Prediction output post-processing
//!
//! Converts raw model outputs into the values returned to clients:
//! rounding, range clamping and positive-class probability extraction.

use crate::error::PredictError;

/// Decimal places kept for regression outputs
pub const REGRESSION_DECIMALS: i32 = 2;

/// Decimal places kept for probability outputs
pub const PROBABILITY_DECIMALS: i32 = 4;

/// How a domain's raw model output becomes the response value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputRule {
    /// Point prediction, rounded
    Regression,
    /// Point prediction clamped to `[min, max]` before rounding
    BoundedRegression { min: f64, max: f64 },
    /// Probability of class 1 from a binary classifier
    PositiveClassProbability,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub regression_decimals: i32,
    pub probability_decimals: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            regression_decimals: REGRESSION_DECIMALS,
            probability_decimals: PROBABILITY_DECIMALS,
        }
    }
}

/// Formats raw model outputs into response values
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Format a point prediction under a regression rule
    pub fn format_point(&self, rule: OutputRule, raw: f32) -> Result<f64, PredictError> {
        let value = f64::from(raw);
        if !value.is_finite() {
            return Err(PredictError::NonFiniteOutput);
        }
        let value = match rule {
            OutputRule::BoundedRegression { min, max } => value.clamp(min, max),
            OutputRule::Regression | OutputRule::PositiveClassProbability => value,
        };
        Ok(round_to(value, self.config.regression_decimals))
    }

    /// Extract P(class = 1) from a two-element probability vector
    pub fn format_positive_class(&self, probabilities: &[f32]) -> Result<f64, PredictError> {
        if probabilities.len() != 2 {
            return Err(PredictError::NotBinaryClassifier(format!(
                "{} class probabilities",
                probabilities.len()
            )));
        }
        let p = f64::from(probabilities[1]);
        if !p.is_finite() {
            return Err(PredictError::NonFiniteOutput);
        }
        Ok(round_to(p.clamp(0.0, 1.0), self.config.probability_decimals))
    }
}

/// Round to a fixed number of decimal places.
///
/// Works on the exact binary value and breaks exact ties to even, so
/// `0.125` becomes `0.12` and `171.375` becomes `171.38`.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let rounded = format!("{:.*}", decimals.max(0) as usize, value)
        .parse::<f64>()
        .unwrap_or(value);
    // "-0.00" parses to negative zero
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
