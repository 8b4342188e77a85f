//! End-to-end forecast for the open period
//!
//! History and parameters are fetched through the [`FetchPolicy`](crate::policy::FetchPolicy). The
//! units and value series are each fitted with the seasonal model, blended
//! with the partial actuals and validated. An upstream failure degrades the
//! result and shows up in its diagnostics; it never fails the call.

use crate::config::{ConfidenceConfig, EngineConfig, ForecastParameters};
use crate::data::{HistoricalPoint, HistoricalSeries};
use crate::ensemble::EnsembleBlender;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, SeasonalFit, SeasonalForecaster};
use crate::period::PeriodKey;
use crate::policy::FetchOutcome;
use crate::ports::{AccuracyStore, ConfigurationStore, HistoricalDataSource, StoredForecast};
use crate::validator::{ConfidenceLabel, ForecastValidator, TrailingStats};
use chrono::{NaiveDate, NaiveDateTime};
use forecast_math::PolynomialTrend;
use serde::{Deserialize, Serialize};
use sla_calendar::BusinessCalendar;
use std::sync::Arc;

/// Backtest error of the forecast, with its coarse label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub units_mape: f64,
    pub value_mape: f64,
    pub confidence_label: ConfidenceLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub period_progress: f64,
    /// Fallbacks, data gaps and validator warnings, in the order they occurred
    pub alerts: Vec<String>,
}

/// Forecast for the open period and the calendar year it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub period_key: PeriodKey,
    pub period_units: f64,
    pub period_value: f64,
    pub annual_units: f64,
    pub annual_value: f64,
    /// In `[0, 1]`
    pub confidence: f64,
    pub accuracy: AccuracySummary,
    pub diagnostics: Diagnostics,
    pub model_used: String,
}

impl ForecastResult {
    /// Snapshot to be scored once the period closes
    pub fn to_stored(&self, created_at: NaiveDateTime) -> StoredForecast {
        StoredForecast {
            period_key: self.period_key,
            predicted_units: self.period_units,
            predicted_value: self.period_value,
            model_used: self.model_used.clone(),
            created_at,
        }
    }
}

/// Forecasting pipeline bound to its data sources
pub struct ForecastEngine {
    history: Arc<dyn HistoricalDataSource>,
    settings: Arc<dyn ConfigurationStore>,
    config: EngineConfig,
}

impl ForecastEngine {
    pub fn new(
        history: Arc<dyn HistoricalDataSource>,
        settings: Arc<dyn ConfigurationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            history,
            settings,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Smoothing parameters from the configuration store, or the
    /// configured defaults when the store is unavailable or empty
    pub async fn parameters(&self) -> FetchOutcome<ForecastParameters> {
        let defaults = self.config.parameters;
        let outcome = self
            .config
            .fetch
            .fetch(
                "forecast parameters",
                || self.settings.forecast_parameters(),
                Some(defaults),
            )
            .await;
        match outcome {
            FetchOutcome::Fresh(None) => FetchOutcome::Fresh(defaults),
            FetchOutcome::Fresh(Some(stored)) => match stored.validate() {
                Ok(()) => FetchOutcome::Fresh(stored),
                Err(e) => {
                    log::warn!("stored forecast parameters rejected: {e}");
                    FetchOutcome::Fallback {
                        value: defaults,
                        reason: e.to_string(),
                    }
                }
            },
            FetchOutcome::Fallback { reason, .. } => FetchOutcome::Fallback {
                value: defaults,
                reason,
            },
        }
    }

    /// Closed months before `period`, bounded by `history_months`
    pub async fn history_before(&self, period: PeriodKey) -> FetchOutcome<HistoricalSeries> {
        let months = self.config.history_months.max(1) as i32;
        let (from, to) = (period.offset(-months), period.prev());

        let outcome = self
            .config
            .fetch
            .fetch("history", || self.history.fetch_history(from, to), Vec::new())
            .await;

        match outcome {
            FetchOutcome::Fresh(points) => match HistoricalSeries::from_unsorted(points) {
                Ok(series) => FetchOutcome::Fresh(series),
                Err(e) => {
                    log::warn!("history for {from}..{to} rejected: {e}");
                    FetchOutcome::Fallback {
                        value: HistoricalSeries::default(),
                        reason: e.to_string(),
                    }
                }
            },
            FetchOutcome::Fallback { reason, .. } => FetchOutcome::Fallback {
                value: HistoricalSeries::default(),
                reason,
            },
        }
    }

    /// Forecast the period containing `now` from its partial actuals.
    ///
    /// Always returns a result; degraded inputs lower the confidence and
    /// are listed in `diagnostics.alerts`.
    pub async fn forecast_period(
        &self,
        now: NaiveDateTime,
        partial_units: f64,
        partial_value: f64,
    ) -> ForecastResult {
        let period = PeriodKey::from_date(now.date());
        let mut alerts = Vec::new();

        let params = self.parameters().await;
        if let Some(reason) = params.fallback_reason() {
            alerts.push(format!("forecast parameters unavailable, using defaults: {reason}"));
        }
        let history = self.history_before(period).await;
        if let Some(reason) = history.fallback_reason() {
            alerts.push(format!("historical data unavailable: {reason}"));
        }

        self.forecast_from_history(
            period,
            period.progress_at(now),
            &history.into_value(),
            params.into_value(),
            partial_units,
            partial_value,
            alerts,
        )
    }

    /// The synchronous core of [`forecast_period`](Self::forecast_period)
    #[allow(clippy::too_many_arguments)]
    pub fn forecast_from_history(
        &self,
        period: PeriodKey,
        period_progress: f64,
        history: &HistoricalSeries,
        params: ForecastParameters,
        partial_units: f64,
        partial_value: f64,
        mut alerts: Vec<String>,
    ) -> ForecastResult {
        let cfg = &self.config;
        let history = history.before(period);

        let mut missing = history.missing_periods().len();
        if missing > 0 {
            alerts.push(format!(
                "{missing} month(s) missing from history; filled from the preceding month"
            ));
        }
        let filled = history.fill_gaps();

        // Months from the last closed point to the open period
        let horizon = match filled.last_period() {
            Some(last) => last.months_until(&period).max(1) as usize,
            None => 1,
        };
        if horizon > 1 {
            missing += horizon - 1;
            alerts.push(format!(
                "history ends {} month(s) before {period}",
                horizon - 1
            ));
        }

        let forecaster = SeasonalForecaster::new(params, cfg.season_length);
        let units_fit = forecaster.fit_series(&filled.units());
        let value_fit = forecaster.fit_series(&filled.values());
        if !units_fit.sufficient_data {
            alerts.push(format!(
                "{} month(s) of history is less than one season of {}; seasonal forecast unavailable",
                filled.len(),
                cfg.season_length
            ));
        }

        let blender = EnsembleBlender::new(cfg.blend);
        let units_blend = blender.blend_with_actual(
            partial_units,
            units_fit.forecast_ahead(horizon),
            period_progress,
        );
        let value_blend = blender.blend_with_actual(
            partial_value,
            value_fit.forecast_ahead(horizon),
            period_progress,
        );

        let mut stats = TrailingStats::from_history(&filled, cfg.validator.trailing_window);
        if horizon > 1 {
            // The last closed month is not the one before `period`
            stats.previous_units = None;
            stats.prior_growth = None;
            alerts.push("growth check skipped: no actuals for the month before".to_string());
        }
        let validation =
            ForecastValidator::new(cfg.validator).validate(units_blend.value, value_blend.value, &stats);
        alerts.extend(validation.warnings.iter().cloned());

        let floor_units = partial_units.max(0.0);
        let floor_value = partial_value.max(0.0);
        let period_units = validation.final_units().max(floor_units);
        let period_value = validation.final_value().max(floor_value);
        if period_units > validation.final_units() || period_value > validation.final_value() {
            alerts.push("validated forecast raised to the partial actuals already recorded".to_string());
        }

        let annual_units = annual_total(&filled, period, period_units, &units_fit, |p| {
            p.units_completed as f64
        });
        let annual_value = annual_total(&filled, period, period_value, &value_fit, |p| p.value_total);

        let label = mape_label(&cfg.confidence, units_fit.backtest_mape).cap(validation.confidence);
        let confidence = confidence_score(&cfg.confidence, units_fit.backtest_mape, missing, label);

        log::debug!(
            "{period}: progress {period_progress:.2}, units {period_units:.1}, value {period_value:.2}, \
             confidence {confidence:.2} ({label})"
        );

        ForecastResult {
            period_key: period,
            period_units,
            period_value,
            annual_units,
            annual_value,
            confidence,
            accuracy: AccuracySummary {
                units_mape: units_fit.backtest_mape,
                value_mape: value_fit.backtest_mape,
                confidence_label: label,
            },
            diagnostics: Diagnostics {
                period_progress,
                alerts,
            },
            model_used: forecaster.name().to_string(),
        }
    }

    /// Forecast and save a snapshot for later accuracy scoring.
    ///
    /// The forecast is returned even when the snapshot cannot be saved; the
    /// failure is logged and added to the diagnostics.
    pub async fn forecast_and_snapshot(
        &self,
        store: &dyn AccuracyStore,
        now: NaiveDateTime,
        partial_units: f64,
        partial_value: f64,
    ) -> ForecastResult {
        let mut result = self.forecast_period(now, partial_units, partial_value).await;
        let snapshot = result.to_stored(now);
        let saved = self
            .config
            .fetch
            .attempt("forecast snapshot", || store.save_forecast(snapshot.clone()))
            .await;
        if let Err(e) = saved {
            let failure = ForecastError::PersistenceFailure(e.to_string());
            log::warn!("snapshot for {} not saved: {failure}", result.period_key);
            result.diagnostics.alerts.push(failure.to_string());
        }
        result
    }

    /// Business calendar covering `from..=to`.
    ///
    /// When the rules cannot be fetched the calendar has no working time,
    /// so deadlines are under-credited rather than over-credited.
    pub async fn load_calendar(&self, from: NaiveDate, to: NaiveDate) -> FetchOutcome<BusinessCalendar> {
        let policy = &self.config.fetch;
        let rules = policy
            .fetch("working hours", || self.settings.working_hours(), Vec::new())
            .await;
        let holidays = policy
            .fetch("holidays", || self.settings.holidays(from, to), Vec::new())
            .await;

        let reason = [rules.fallback_reason(), holidays.fallback_reason()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("; ");
        let calendar = BusinessCalendar::new(rules.value(), holidays.value());

        if reason.is_empty() {
            FetchOutcome::Fresh(calendar)
        } else {
            FetchOutcome::Fallback {
                value: calendar,
                reason,
            }
        }
    }

    /// Smooth trend through the daily totals of `period`.
    ///
    /// `daily_totals[i]` is day `i + 1`; days with no positive total are
    /// left out of the fit. Returns one non-negative value per day of the
    /// month.
    pub fn daily_trend(&self, period: PeriodKey, daily_totals: &[f64]) -> Result<Vec<f64>> {
        let xs: Vec<f64> = (1..=daily_totals.len()).map(|d| d as f64).collect();
        let trend = PolynomialTrend::fit(&xs, daily_totals, self.config.trend_degree)?;
        let days: Vec<f64> = (1..=period.days_in_month()).map(|d| d as f64).collect();
        Ok(trend
            .trend_line(&days)
            .into_iter()
            .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
            .collect())
    }
}

/// Every month of the calendar year containing `period`: closed actuals
/// from the gap-filled history, the period forecast, and the seasonal
/// projection for months after the last closed point. Months before the
/// history starts repeat the period forecast, as do projected months when
/// the model had too little data.
fn annual_total<F>(
    filled: &HistoricalSeries,
    period: PeriodKey,
    period_forecast: f64,
    fit: &SeasonalFit,
    measure: F,
) -> f64
where
    F: Fn(&HistoricalPoint) -> f64,
{
    let last = filled.last_period();
    let first_offset = 1 - period.month() as i32;
    let last_offset = 12 - period.month() as i32;

    (first_offset..=last_offset)
        .map(|offset| {
            let month = period.offset(offset);
            if offset == 0 {
                return period_forecast;
            }
            if let Some(point) = filled.get(month) {
                return measure(point);
            }
            match last {
                Some(last) if last < month && fit.sufficient_data => {
                    fit.forecast_ahead(last.months_until(&month) as usize)
                }
                _ => period_forecast,
            }
        })
        .sum()
}

fn mape_label(config: &ConfidenceConfig, mape: f64) -> ConfidenceLabel {
    if mape <= config.high_max_mape {
        ConfidenceLabel::High
    } else if mape <= config.medium_max_mape {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

fn confidence_score(
    config: &ConfidenceConfig,
    mape: f64,
    missing_months: usize,
    label: ConfidenceLabel,
) -> f64 {
    let ceiling = match label {
        ConfidenceLabel::High => 1.0,
        ConfidenceLabel::Medium => 0.8,
        ConfidenceLabel::Low => 0.5,
    };
    let score = 1.0 - mape / 100.0 - config.gap_penalty * missing_months as f64;
    score.min(ceiling).clamp(0.0, 1.0)
}
