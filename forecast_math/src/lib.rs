//! # Forecast Math
//!
//! Numerical building blocks shared by the forecasting engine.
//! This crate provides a least-squares polynomial trend fitter, the small
//! dense linear solver behind it, a trailing moving average and the error
//! metrics used to score forecasts.

use thiserror::Error;

pub mod linear_system;
pub mod metrics;
pub mod moving_averages;
pub mod polynomial;

pub use linear_system::solve_linear_system;
pub use polynomial::{evaluate_polynomial, fit_polynomial, PolynomialTrend};

/// Errors that can occur in forecasting math
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;
