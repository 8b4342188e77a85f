//! Sanity checks for blended forecasts
//!
//! Four rules run in order, each on the output of the previous one:
//!
//! 1. absolute range around the trailing average (clamps, marks invalid)
//! 2. growth over the previous period against an expected band (clamps)
//! 3. deviation from the trailing average (flags only)
//! 4. implied value per unit against the trailing value per unit
//!    (rebuilds the value forecast)
//!
//! The clamps are chosen so that validating an already adjusted forecast
//! leaves it unchanged.

use crate::config::ValidatorConfig;
use crate::data::HistoricalSeries;
use crate::models::non_negative;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Coarse confidence bucket. Orders `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// Lower `self` to at most `ceiling`
    pub fn cap(self, ceiling: ConfidenceLabel) -> ConfidenceLabel {
        self.min(ceiling)
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLabel::High => "high",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::Low => "low",
        };
        f.write_str(label)
    }
}

/// Reference figures derived from closed months
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingStats {
    pub average_units: f64,
    pub average_value: f64,
    /// `average_value / average_units`
    pub value_per_unit: Option<f64>,
    /// Units in the most recent closed month
    pub previous_units: Option<f64>,
    /// Growth of the most recent month over the one before it
    pub prior_growth: Option<f64>,
}

impl TrailingStats {
    /// Statistics over the last `window` points of `history`
    pub fn from_history(history: &HistoricalSeries, window: usize) -> Self {
        let trailing = history.trailing(window.max(1));
        if trailing.is_empty() {
            return Self::default();
        }

        let units: Vec<f64> = trailing.iter().map(|p| p.units_completed as f64).collect();
        let values: Vec<f64> = trailing.iter().map(|p| p.value_total).collect();
        let average_units = units.iter().mean();
        let average_value = values.iter().mean();

        let value_per_unit = if average_units > 0.0 {
            Some(average_value / average_units)
        } else {
            None
        };

        let previous_units = units.last().copied();
        let prior_growth = match units.as_slice() {
            [.., before, last] if *before > 0.0 => Some(last / before - 1.0),
            _ => None,
        };

        Self {
            average_units,
            average_value,
            value_per_unit,
            previous_units,
            prior_growth,
        }
    }
}

/// Outcome of validating one forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// False only when the absolute-range rule fired
    pub is_valid: bool,
    /// Set when the units forecast was changed
    pub adjusted_units: Option<f64>,
    /// Set when the value forecast was changed
    pub adjusted_value: Option<f64>,
    pub warnings: Vec<String>,
    pub confidence: ConfidenceLabel,
    /// Deviation of the final units from the trailing average, in percent
    pub deviation_pct: f64,
    units: f64,
    value: f64,
}

impl ValidationOutcome {
    /// Units after all adjustments
    pub fn final_units(&self) -> f64 {
        self.units
    }

    /// Value after all adjustments
    pub fn final_value(&self) -> f64 {
        self.value
    }

    pub fn was_adjusted(&self) -> bool {
        self.adjusted_units.is_some() || self.adjusted_value.is_some()
    }
}

/// Applies the four sanity rules with a fixed configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastValidator {
    config: ValidatorConfig,
}

fn outside(x: f64, lo: f64, hi: f64) -> bool {
    let tol = |bound: f64| 1e-9 * bound.abs().max(1.0);
    x < lo - tol(lo) || x > hi + tol(hi)
}

impl ForecastValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate(
        &self,
        forecast_units: f64,
        forecast_value: f64,
        stats: &TrailingStats,
    ) -> ValidationOutcome {
        let cfg = &self.config;
        let input_units = non_negative(forecast_units);
        let input_value = non_negative(forecast_value);
        let mut units = input_units;
        let mut value = input_value;
        let mut warnings = Vec::new();
        let mut confidence = ConfidenceLabel::High;
        let mut is_valid = true;

        let has_history = stats.average_units > 0.0;
        let unit_range = (
            stats.average_units * cfg.lower_bound_factor,
            stats.average_units * cfg.upper_bound_factor,
        );
        let value_range = (
            stats.average_value * cfg.lower_bound_factor,
            stats.average_value * cfg.upper_bound_factor,
        );

        // Rule 1: absolute range
        if has_history {
            if outside(units, unit_range.0, unit_range.1) {
                let clamped = units.clamp(unit_range.0, unit_range.1);
                warnings.push(format!(
                    "units forecast {units:.1} outside [{:.1}, {:.1}]; clamped to {clamped:.1}",
                    unit_range.0, unit_range.1
                ));
                units = clamped;
                is_valid = false;
                confidence = ConfidenceLabel::Low;
            }
            if stats.average_value > 0.0 && outside(value, value_range.0, value_range.1) {
                let clamped = value.clamp(value_range.0, value_range.1);
                warnings.push(format!(
                    "value forecast {value:.2} outside [{:.2}, {:.2}]; clamped to {clamped:.2}",
                    value_range.0, value_range.1
                ));
                value = clamped;
                is_valid = false;
                confidence = ConfidenceLabel::Low;
            }
        } else {
            warnings.push("no trailing history; range checks skipped".to_string());
            confidence = confidence.cap(ConfidenceLabel::Medium);
        }

        // Rule 2: trend consistency
        if let Some(previous) = stats.previous_units.filter(|p| *p > 0.0) {
            let accelerating = stats
                .prior_growth
                .is_some_and(|g| g > cfg.acceleration_threshold);
            let band = if accelerating {
                cfg.accelerated_growth_band
            } else {
                cfg.normal_growth_band
            };
            let (band_lo, band_hi) = (previous * (1.0 + band.min), previous * (1.0 + band.max));

            if outside(units, band_lo, band_hi) {
                let growth_pct = (units / previous - 1.0) * 100.0;
                let (lo, hi) = if has_history {
                    (band_lo.max(unit_range.0), band_hi.min(unit_range.1))
                } else {
                    (band_lo, band_hi)
                };

                if lo <= hi {
                    let clamped = units.clamp(lo, hi);
                    warnings.push(format!(
                        "growth of {growth_pct:.1}% over last period outside expected band \
                         [{:.0}%, {:.0}%]{}; units clamped to {clamped:.1}",
                        band.min * 100.0,
                        band.max * 100.0,
                        if accelerating { " (accelerating)" } else { "" }
                    ));
                    units = clamped;
                } else {
                    warnings.push(format!(
                        "growth of {growth_pct:.1}% over last period outside expected band, \
                         which does not overlap the trailing range; left unclamped"
                    ));
                }
                confidence = confidence.cap(ConfidenceLabel::Medium);
            }
        }

        // Rule 3: deviation from trailing average
        let deviation_pct = if has_history {
            (units - stats.average_units) / stats.average_units * 100.0
        } else {
            0.0
        };
        if deviation_pct.abs() > cfg.max_deviation_pct {
            warnings.push(format!(
                "units deviate {deviation_pct:.1}% from the trailing average (limit {:.0}%)",
                cfg.max_deviation_pct
            ));
            confidence = confidence.cap(ConfidenceLabel::Medium);
        }

        // Rule 4: value-per-unit consistency
        if let Some(expected) = stats.value_per_unit.filter(|v| *v > 0.0) {
            if units > 0.0 {
                let implied = value / units;
                let drift = (implied - expected).abs() / expected;
                if drift > cfg.value_per_unit_tolerance {
                    let rebuilt = units * expected;
                    warnings.push(format!(
                        "implied value per unit {implied:.2} differs {:.0}% from trailing {expected:.2}; \
                         value forecast set to {rebuilt:.2}",
                        drift * 100.0
                    ));
                    value = rebuilt;
                    confidence = confidence.cap(ConfidenceLabel::Medium);
                }
            }
        }

        ValidationOutcome {
            is_valid,
            adjusted_units: (units != forecast_units).then_some(units),
            adjusted_value: (value != forecast_value).then_some(value),
            warnings,
            confidence,
            deviation_pct,
            units,
            value,
        }
    }
}
