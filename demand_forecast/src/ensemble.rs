//! Blend of the intra-period run-rate and the seasonal forecast

use crate::config::BlendConfig;
use crate::models::non_negative;
use serde::{Deserialize, Serialize};

/// Combines a partial-period extrapolation with the seasonal model.
///
/// Early in the period the run-rate carries most of the weight; past the
/// midpoint the weight slides towards an even split.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleBlender {
    config: BlendConfig,
}

/// Result of blending one series for the current period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendOutcome {
    /// Blended forecast, never below the partial actual
    pub value: f64,
    /// Full-period extrapolation of the partial actual, if progress allowed one
    pub run_rate: Option<f64>,
    /// Share of the blend given to the run-rate
    pub run_rate_weight: f64,
    /// True when the blend was raised to the realised partial actual
    pub floored_at_actual: bool,
}

impl EnsembleBlender {
    pub fn new(config: BlendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    /// Linear extrapolation of `partial_actual` to the full period.
    ///
    /// Past the late-period threshold the result is multiplied by the
    /// late-period boost. `None` when no time has elapsed.
    pub fn run_rate(&self, partial_actual: f64, period_progress: f64) -> Option<f64> {
        if !period_progress.is_finite() || period_progress <= 0.0 {
            return None;
        }
        let progress = period_progress.min(1.0);
        let mut rate = non_negative(partial_actual) / progress;
        if progress > self.config.late_period_threshold {
            rate *= self.config.late_period_boost;
        }
        Some(rate)
    }

    /// Run-rate share of the blend at `period_progress`
    pub fn run_rate_weight(&self, period_progress: f64) -> f64 {
        let early = self.config.early_run_rate_weight;
        let late = self.config.late_run_rate_weight;
        if period_progress <= 0.5 {
            return early;
        }
        let t = ((period_progress - 0.5) / 0.5).clamp(0.0, 1.0);
        early + (late - early) * t
    }

    /// Weighted blend of an already computed run-rate and seasonal forecast.
    ///
    /// A non-positive seasonal forecast means the model had nothing to say,
    /// so the run-rate is used alone.
    pub fn blend(&self, run_rate: f64, seasonal_forecast: f64, period_progress: f64) -> f64 {
        if seasonal_forecast <= 0.0 {
            return non_negative(run_rate);
        }
        let weight = self.run_rate_weight(period_progress);
        non_negative(weight * run_rate + (1.0 - weight) * seasonal_forecast)
    }

    /// Blend from the partial actual, flooring at what has already happened
    pub fn blend_with_actual(
        &self,
        partial_actual: f64,
        seasonal_forecast: f64,
        period_progress: f64,
    ) -> BlendOutcome {
        let partial_actual = non_negative(partial_actual);
        let seasonal_forecast = non_negative(seasonal_forecast);

        let (blended, run_rate, weight) = match self.run_rate(partial_actual, period_progress) {
            Some(rate) => (
                self.blend(rate, seasonal_forecast, period_progress),
                Some(rate),
                if seasonal_forecast > 0.0 {
                    self.run_rate_weight(period_progress)
                } else {
                    1.0
                },
            ),
            None => (seasonal_forecast, None, 0.0),
        };

        BlendOutcome {
            value: blended.max(partial_actual),
            run_rate,
            run_rate_weight: weight,
            floored_at_actual: blended < partial_actual,
        }
    }
}
