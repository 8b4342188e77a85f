//! Forecasting models for monthly series

use serde::{Deserialize, Serialize};

pub mod holt_winters;
pub mod moving_average;

pub use holt_winters::{SeasonalFit, SeasonalForecaster};
pub use moving_average::TrailingAverageModel;

/// Backtest MAPE reported when a series is too short to score
pub const INSUFFICIENT_DATA_MAPE: f64 = 50.0;

/// Ceiling on a reported backtest MAPE so one degenerate month cannot
/// dominate the confidence figure
pub const MAPE_CEILING: f64 = 50.0;

/// One-step-ahead forecast and how well the model did on its own history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelFit {
    /// Forecast for the period after the series, never negative
    pub forecast: f64,
    /// Mean absolute percentage error of in-sample one-step forecasts
    pub backtest_mape: f64,
    /// False when the series was too short and the fallback was returned
    pub sufficient_data: bool,
}

/// Common interface for forecasting models
pub trait ForecastModel {
    /// Stable name, recorded alongside accuracy results
    fn name(&self) -> &str;

    /// Fit on `series` (oldest first) and forecast the next period
    fn fit(&self, series: &[f64]) -> ModelFit;
}

/// Replace negative and non-finite observations with zero
pub(crate) fn clean_series(series: &[f64]) -> Vec<f64> {
    series
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect()
}

/// Floor a forecast at zero, mapping non-finite values to zero
pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
