//! Trailing moving-average model
//!
//! A deliberately simple baseline. The accuracy tracker uses it to
//! reconstruct what a forecast would have been for a period that closed
//! without a stored live forecast.

use crate::models::{clean_series, non_negative, ForecastModel, ModelFit, MAPE_CEILING};
use forecast_math::metrics::mean_absolute_percentage_error;
use forecast_math::moving_averages::trailing_average;

/// Forecast = mean of the last `window` observations
#[derive(Debug, Clone)]
pub struct TrailingAverageModel {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

impl TrailingAverageModel {
    /// Create a model over `window` periods; a zero window is treated as 1
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            name: format!("trailing_{window}_month_average"),
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for TrailingAverageModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, series: &[f64]) -> ModelFit {
        let y = clean_series(series);
        let forecast = trailing_average(&y, self.window).map_or(0.0, non_negative);

        let mut actuals = Vec::new();
        let mut predictions = Vec::new();
        for t in self.window..y.len() {
            if let Ok(prediction) = trailing_average(&y[..t], self.window) {
                predictions.push(prediction);
                actuals.push(y[t]);
            }
        }

        let backtest_mape = mean_absolute_percentage_error(&actuals, &predictions)
            .unwrap_or(MAPE_CEILING)
            .min(MAPE_CEILING);

        ModelFit {
            forecast,
            backtest_mape,
            sufficient_data: y.len() >= self.window,
        }
    }
}
