//! Engine configuration
//!
//! Every tuned constant lives here as a named default. A JSON document only
//! needs to name the fields it overrides; the rest fall back to defaults.

use crate::error::{ForecastError, Result};
use crate::policy::FetchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ALPHA: f64 = 0.3;
pub const DEFAULT_BETA: f64 = 0.1;
pub const DEFAULT_GAMMA: f64 = 0.2;

/// Months in one seasonal cycle
pub const DEFAULT_SEASON_LENGTH: usize = 12;

/// Degree of the daily trend line within a period
pub const DEFAULT_TREND_DEGREE: usize = 2;

/// Period progress after which the run-rate gets the late-month boost
pub const LATE_PERIOD_THRESHOLD: f64 = 0.7;
/// Multiplier countering late-month undercounting of completed services
pub const LATE_PERIOD_BOOST: f64 = 1.05;
/// Run-rate share of the blend up to mid-period
pub const EARLY_RUN_RATE_WEIGHT: f64 = 0.7;
/// Run-rate share of the blend at period end
pub const LATE_RUN_RATE_WEIGHT: f64 = 0.5;

pub const LOWER_BOUND_FACTOR: f64 = 0.7;
pub const UPPER_BOUND_FACTOR: f64 = 1.8;
pub const MAX_DEVIATION_PCT: f64 = 25.0;
/// Prior-period growth above which history counts as accelerating
pub const ACCELERATION_THRESHOLD: f64 = 0.15;
pub const VALUE_PER_UNIT_TOLERANCE: f64 = 0.20;
pub const TRAILING_WINDOW: usize = 12;

pub const ALERT_THRESHOLD_PCT: f64 = 25.0;
pub const CRITICAL_THRESHOLD_PCT: f64 = 40.0;
/// Months averaged by the retrospective fallback model
pub const FALLBACK_WINDOW: usize = 12;

/// Smoothing coefficients for level, trend and seasonality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParameters {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    /// Set when an operator overrode the system defaults
    pub use_manual: bool,
}

impl Default for ForecastParameters {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            use_manual: false,
        }
    }
}

impl ForecastParameters {
    pub fn manual(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            use_manual: true,
        }
    }

    /// Check that every coefficient is a finite number in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} = {value} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Coefficients clamped into `[0, 1]`; non-finite ones take the default
    pub fn sanitized(&self) -> Self {
        fn fix(value: f64, default: f64) -> f64 {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                default
            }
        }
        Self {
            alpha: fix(self.alpha, DEFAULT_ALPHA),
            beta: fix(self.beta, DEFAULT_BETA),
            gamma: fix(self.gamma, DEFAULT_GAMMA),
            use_manual: self.use_manual,
        }
    }
}

/// Run-rate and blend weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub late_period_threshold: f64,
    pub late_period_boost: f64,
    pub early_run_rate_weight: f64,
    pub late_run_rate_weight: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            late_period_threshold: LATE_PERIOD_THRESHOLD,
            late_period_boost: LATE_PERIOD_BOOST,
            early_run_rate_weight: EARLY_RUN_RATE_WEIGHT,
            late_run_rate_weight: LATE_RUN_RATE_WEIGHT,
        }
    }
}

/// Allowed period-over-period growth, as fractions (`0.25` is +25%)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthBand {
    pub min: f64,
    pub max: f64,
}

/// Sanity bounds applied to a blended forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub lower_bound_factor: f64,
    pub upper_bound_factor: f64,
    pub max_deviation_pct: f64,
    pub acceleration_threshold: f64,
    pub normal_growth_band: GrowthBand,
    pub accelerated_growth_band: GrowthBand,
    pub value_per_unit_tolerance: f64,
    pub trailing_window: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            lower_bound_factor: LOWER_BOUND_FACTOR,
            upper_bound_factor: UPPER_BOUND_FACTOR,
            max_deviation_pct: MAX_DEVIATION_PCT,
            acceleration_threshold: ACCELERATION_THRESHOLD,
            normal_growth_band: GrowthBand {
                min: -0.20,
                max: 0.25,
            },
            accelerated_growth_band: GrowthBand {
                min: -0.30,
                max: 0.50,
            },
            value_per_unit_tolerance: VALUE_PER_UNIT_TOLERANCE,
            trailing_window: TRAILING_WINDOW,
        }
    }
}

/// Accuracy tracking thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyConfig {
    pub alert_threshold_pct: f64,
    pub critical_threshold_pct: f64,
    pub fallback_window: usize,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            alert_threshold_pct: ALERT_THRESHOLD_PCT,
            critical_threshold_pct: CRITICAL_THRESHOLD_PCT,
            fallback_window: FALLBACK_WINDOW,
        }
    }
}

/// Mapping from backtest error to reported confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Backtest MAPE at or below which confidence is High
    pub high_max_mape: f64,
    /// Backtest MAPE at or below which confidence is Medium
    pub medium_max_mape: f64,
    /// Confidence removed per missing month in the history
    pub gap_penalty: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high_max_mape: 10.0,
            medium_max_mape: 20.0,
            gap_penalty: 0.05,
        }
    }
}

/// Everything the engine needs, passed explicitly into each call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub season_length: usize,
    /// Months of history requested from the data source
    pub history_months: usize,
    /// Degree of the polynomial drawn through daily totals
    pub trend_degree: usize,
    pub parameters: ForecastParameters,
    pub blend: BlendConfig,
    pub validator: ValidatorConfig,
    pub accuracy: AccuracyConfig,
    pub confidence: ConfidenceConfig,
    pub fetch: FetchPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            season_length: DEFAULT_SEASON_LENGTH,
            history_months: 36,
            trend_degree: DEFAULT_TREND_DEGREE,
            parameters: ForecastParameters::default(),
            blend: BlendConfig::default(),
            validator: ValidatorConfig::default(),
            accuracy: AccuracyConfig::default(),
            confidence: ConfidenceConfig::default(),
            fetch: FetchPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
