//! Error types for the demand_forecast crate

use forecast_math::MathError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Series too short for the requested model
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A historical-data or configuration call failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A call did not answer within its time budget
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Writing an accuracy record or alert failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
