//! Error metrics for scoring forecasts against actuals
//!
//! Percentages are on a 0-100 scale. Observations whose actual value is
//! zero are skipped by the percentage metrics instead of dividing by zero.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `|predicted - actual| / actual * 100`, or 0 when `actual` is 0
pub fn percentage_error(predicted: f64, actual: f64) -> f64 {
    if actual == 0.0 || !actual.is_finite() || !predicted.is_finite() {
        return 0.0;
    }
    (predicted - actual).abs() / actual.abs() * 100.0
}

/// Accuracy on a 0-100 scale from a percentage error
pub fn accuracy_from_error(percentage_error: f64) -> f64 {
    100.0 - percentage_error
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "No observations to score".to_string(),
        ));
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Mean absolute percentage error over the observations with a non-zero actual.
///
/// Returns 0 when no observation qualifies.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(&a, _)| a != 0.0 && a.is_finite())
        .map(|(&a, &p)| percentage_error(p, a))
        .collect();

    if errors.is_empty() {
        return Ok(0.0);
    }
    Ok(errors.iter().sum::<f64>() / errors.len() as f64)
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Observations scored
    pub samples: usize,
}

impl ForecastAccuracy {
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        Ok(Self {
            mae: mean_absolute_error(actual, predicted)?,
            mape: mean_absolute_percentage_error(actual, predicted)?,
            samples: actual.len(),
        })
    }

    pub fn accuracy(&self) -> f64 {
        accuracy_from_error(self.mape)
    }
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:     {:.4}", self.mae)?;
        writeln!(f, "  MAPE:    {:.4}%", self.mape)?;
        writeln!(f, "  Samples: {}", self.samples)?;
        Ok(())
    }
}
