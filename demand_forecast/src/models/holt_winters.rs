//! Holt-Winters triple exponential smoothing
//!
//! Multiplicative seasonality on raw monthly counts:
//! - Level: `l_t = α(y_t / s_p) + (1-α)(l_{t-1} + b_{t-1})`
//! - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)b_{t-1}`
//! - Seasonal: `s_p = γ(y_t / l_t) + (1-γ)s_p`
//! - Forecast: `ŷ_{t+h} = (l_t + h·b_t) · s_{(t+h) mod m}`

use crate::config::{ForecastParameters, DEFAULT_SEASON_LENGTH};
use crate::models::{
    clean_series, non_negative, ForecastModel, ModelFit, INSUFFICIENT_DATA_MAPE, MAPE_CEILING,
};
use forecast_math::metrics::mean_absolute_percentage_error;
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

/// Seasonal forecaster with fixed smoothing coefficients
#[derive(Debug, Clone)]
pub struct SeasonalForecaster {
    /// Name of the model
    name: String,
    /// Smoothing coefficients
    params: ForecastParameters,
    /// Observations per seasonal cycle
    season_length: usize,
}

/// Fitted model state after one pass over the series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFit {
    /// Next-period forecast, never negative
    pub forecast: f64,
    /// Capped MAPE of in-sample one-step forecasts after the first season
    pub backtest_mape: f64,
    pub level: f64,
    pub trend: f64,
    /// Seasonal index per phase, unitless and near 1.0
    pub seasonals: Vec<f64>,
    /// Length of the series that was fitted
    pub observations: usize,
    /// False when the series was shorter than one season
    pub sufficient_data: bool,
}

impl SeasonalFit {
    fn insufficient(observations: usize, season_length: usize) -> Self {
        Self {
            forecast: 0.0,
            backtest_mape: INSUFFICIENT_DATA_MAPE,
            level: 0.0,
            trend: 0.0,
            seasonals: vec![1.0; season_length],
            observations,
            sufficient_data: false,
        }
    }

    /// Forecast `horizon` periods past the end of the series (1 = next period)
    pub fn forecast_ahead(&self, horizon: usize) -> f64 {
        if !self.sufficient_data || horizon == 0 || self.seasonals.is_empty() {
            return 0.0;
        }
        let phase = (self.observations + horizon - 1) % self.seasonals.len();
        non_negative((self.level + horizon as f64 * self.trend) * self.seasonals[phase])
    }

    pub fn as_model_fit(&self) -> ModelFit {
        ModelFit {
            forecast: self.forecast,
            backtest_mape: self.backtest_mape,
            sufficient_data: self.sufficient_data,
        }
    }
}

impl SeasonalForecaster {
    /// Create a forecaster; coefficients are clamped into `[0, 1]`
    pub fn new(params: ForecastParameters, season_length: usize) -> Self {
        let params = params.sanitized();
        Self {
            name: format!(
                "holt_winters(alpha={}, beta={}, gamma={}, m={})",
                params.alpha, params.beta, params.gamma, season_length
            ),
            params,
            season_length,
        }
    }

    pub fn params(&self) -> &ForecastParameters {
        &self.params
    }

    pub fn season_length(&self) -> usize {
        self.season_length
    }

    /// Fit the model in one forward pass.
    ///
    /// Series shorter than one season get the conservative fallback:
    /// a zero forecast and [`INSUFFICIENT_DATA_MAPE`].
    pub fn fit_series(&self, series: &[f64]) -> SeasonalFit {
        let m = self.season_length;
        if m == 0 || series.len() < m {
            log::debug!(
                "holt_winters: {} observations is less than one season of {m}",
                series.len()
            );
            return SeasonalFit::insufficient(series.len(), m);
        }

        let y = clean_series(series);
        let ForecastParameters {
            alpha, beta, gamma, ..
        } = self.params;

        let mut level = y[0];
        let mut trend = 0.0;
        let mut seasonals: Vec<f64> = y[..m]
            .iter()
            .map(|&v| if level > EPSILON { v / level } else { 1.0 })
            .collect();

        let mut actuals = Vec::with_capacity(y.len().saturating_sub(m));
        let mut predictions = Vec::with_capacity(y.len().saturating_sub(m));

        for (t, &observed) in y.iter().enumerate() {
            let phase = t % m;
            let seasonal = seasonals[phase];

            if t >= m {
                predictions.push(non_negative((level + trend) * seasonal));
                actuals.push(observed);
            }

            let deseasonalized = if seasonal > EPSILON {
                observed / seasonal
            } else {
                observed
            };
            let previous_level = level;
            level = alpha * deseasonalized + (1.0 - alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
            if level > EPSILON {
                seasonals[phase] = gamma * (observed / level) + (1.0 - gamma) * seasonal;
            }
        }

        let backtest_mape = mean_absolute_percentage_error(&actuals, &predictions)
            .unwrap_or(MAPE_CEILING)
            .min(MAPE_CEILING);

        let mut fit = SeasonalFit {
            forecast: 0.0,
            backtest_mape,
            level,
            trend,
            seasonals,
            observations: y.len(),
            sufficient_data: true,
        };
        fit.forecast = fit.forecast_ahead(1);

        log::debug!(
            "holt_winters: level={:.3} trend={:.3} forecast={:.3} mape={:.2}",
            fit.level,
            fit.trend,
            fit.forecast,
            fit.backtest_mape
        );
        fit
    }
}

impl Default for SeasonalForecaster {
    fn default() -> Self {
        Self::new(ForecastParameters::default(), DEFAULT_SEASON_LENGTH)
    }
}

impl ForecastModel for SeasonalForecaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&self, series: &[f64]) -> ModelFit {
        self.fit_series(series).as_model_fit()
    }
}

/// Fit a seasonal forecaster with the given parameters in one call
pub fn fit(series: &[f64], params: &ForecastParameters, season_length: usize) -> SeasonalFit {
    SeasonalForecaster::new(*params, season_length).fit_series(series)
}
