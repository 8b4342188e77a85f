//! Least-squares polynomial trend lines
//!
//! Used to draw a smooth short-horizon trend through noisy daily points
//! inside a period. Only strictly positive observations take part in the
//! fit, so days that have not happened yet (or were never recorded) do not
//! drag the curve towards zero.

use crate::linear_system::solve_linear_system;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Highest degree accepted by [`PolynomialTrend::fit`]
pub const MAX_DEGREE: usize = 6;

/// Fitted polynomial with coefficients in ascending power order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialTrend {
    coefficients: Vec<f64>,
    points_used: usize,
}

impl PolynomialTrend {
    /// Fit a polynomial of `degree` through the positive points of `(xs, ys)`
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(MathError::InvalidInput(format!(
                "x has {} values but y has {}",
                xs.len(),
                ys.len()
            )));
        }
        if degree > MAX_DEGREE {
            return Err(MathError::InvalidInput(format!(
                "degree {degree} exceeds the maximum of {MAX_DEGREE}"
            )));
        }

        let points: Vec<(f64, f64)> = positive_points(xs, ys).collect();
        if points.is_empty() {
            return Err(MathError::InsufficientData(
                "no positive observations to fit".to_string(),
            ));
        }

        let size = degree + 1;
        let mut power_sums = vec![0.0; 2 * degree + 1];
        let mut rhs = vec![0.0; size];

        for &(x, y) in &points {
            let mut xp = 1.0;
            for (k, sum) in power_sums.iter_mut().enumerate() {
                *sum += xp;
                if k < size {
                    rhs[k] += y * xp;
                }
                xp *= x;
            }
        }

        let normal: Vec<Vec<f64>> = (0..size)
            .map(|i| (0..size).map(|j| power_sums[i + j]).collect())
            .collect();

        let coefficients = solve_linear_system(&normal, &rhs)?;

        Ok(Self {
            coefficients,
            points_used: points.len(),
        })
    }

    /// Coefficients, constant term first
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Number of observations that survived the positive-value filter
    pub fn points_used(&self) -> usize {
        self.points_used
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        evaluate_polynomial(&self.coefficients, x)
    }

    /// Evaluate the curve at each of `xs`
    pub fn trend_line(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Coefficient of determination over the points the fit used
    pub fn r_squared(&self, xs: &[f64], ys: &[f64]) -> Result<f64> {
        let points: Vec<(f64, f64)> = positive_points(xs, ys).collect();
        if points.len() < 2 {
            return Err(MathError::InsufficientData(
                "Not enough data to calculate R-squared. Need at least 2 points.".to_string(),
            ));
        }

        let y_mean = points.iter().map(|p| p.1).sum::<f64>() / points.len() as f64;
        let ss_total: f64 = points.iter().map(|&(_, y)| (y - y_mean).powi(2)).sum();
        let ss_residual: f64 = points
            .iter()
            .map(|&(x, y)| (y - self.evaluate(x)).powi(2))
            .sum();

        if ss_total.abs() < 1e-12 {
            return Ok(if ss_residual.abs() < 1e-12 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_residual / ss_total)
    }
}

fn positive_points<'a>(xs: &'a [f64], ys: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    xs.iter()
        .copied()
        .zip(ys.iter().copied())
        .filter(|&(x, y)| x.is_finite() && y.is_finite() && y > 0.0)
}

/// Fit a polynomial and return its coefficients, constant term first
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    PolynomialTrend::fit(xs, ys, degree).map(|trend| trend.coefficients)
}

/// Evaluate ascending-order coefficients at `x` (Horner's rule)
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
