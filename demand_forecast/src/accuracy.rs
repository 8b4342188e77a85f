//! Scoring closed periods against the forecast made for them
//!
//! A run looks up the snapshot saved while the period was open. When there
//! is none it reconstructs a forecast retrospectively with a trailing
//! moving average over the months before the period. The resulting record
//! is upserted by period, so repeated runs overwrite rather than duplicate.

use crate::config::AccuracyConfig;
use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrailingAverageModel};
use crate::period::PeriodKey;
use crate::policy::FetchPolicy;
use crate::ports::{AccuracyStore, AlertRequest, AlertSeverity, AlertSink, HistoricalDataSource};
use chrono::NaiveDateTime;
use forecast_math::metrics::{accuracy_from_error, percentage_error};
use serde::{Deserialize, Serialize};
use serde_json::json;
use statrs::statistics::Statistics;
use std::sync::Arc;

/// Remediation steps attached to every accuracy alert
pub const SUGGESTED_ACTIONS: [&str; 4] = [
    "Review data quality for the period (late or missing completions)",
    "Backtest the forecasting model against recent history",
    "Recalibrate smoothing parameters",
    "Check for external factors (promotions, staffing, seasonality shifts)",
];

/// Stored outcome of scoring one closed period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub period_key: PeriodKey,
    pub predicted_units: f64,
    pub actual_units: f64,
    pub predicted_value: f64,
    pub actual_value: f64,
    pub units_mape: f64,
    pub value_mape: f64,
    /// `100 - units_mape`
    pub accuracy_pct: f64,
    pub model_used: String,
    pub alert_triggered: bool,
    pub calculated_at: NaiveDateTime,
}

/// Where the predicted figures of a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// Snapshot saved while the period was open
    StoredRecord,
    /// Reconstructed after the fact with the trailing-average model
    RetrospectiveMovingAverage,
}

/// Everything a tracker run produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOutcome {
    pub record: AccuracyRecord,
    pub forecast_source: ForecastSource,
    /// False when the upsert failed; the record is still returned
    pub persisted: bool,
    /// Alert raised for this run, if the error crossed the threshold
    pub alert: Option<AlertRequest>,
    /// False when an alert was raised but could not be delivered
    pub alert_delivered: bool,
}

/// Summary over the most recent accuracy records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTrend {
    pub periods: usize,
    pub mean_units_mape: f64,
    pub mean_value_mape: f64,
    pub mean_accuracy_pct: f64,
    pub alerts: usize,
    /// Whether the newer half of the window has lower error than the older
    /// half; `None` with fewer than two records
    pub improving: Option<bool>,
}

impl AccuracyTrend {
    /// Build a summary from records ordered most recent first
    pub fn from_records(records: &[AccuracyRecord]) -> Self {
        if records.is_empty() {
            return Self {
                periods: 0,
                mean_units_mape: 0.0,
                mean_value_mape: 0.0,
                mean_accuracy_pct: 0.0,
                alerts: 0,
                improving: None,
            };
        }

        let improving = if records.len() >= 2 {
            let half = records.len() / 2;
            let newer = records[..half].iter().map(|r| r.units_mape).mean();
            let older = records[records.len() - half..]
                .iter()
                .map(|r| r.units_mape)
                .mean();
            Some(newer < older)
        } else {
            None
        };

        Self {
            periods: records.len(),
            mean_units_mape: records.iter().map(|r| r.units_mape).mean(),
            mean_value_mape: records.iter().map(|r| r.value_mape).mean(),
            mean_accuracy_pct: records.iter().map(|r| r.accuracy_pct).mean(),
            alerts: records.iter().filter(|r| r.alert_triggered).count(),
            improving,
        }
    }
}

/// Periodic accuracy job for closed periods
pub struct AccuracyTracker {
    history: Arc<dyn HistoricalDataSource>,
    store: Arc<dyn AccuracyStore>,
    alerts: Arc<dyn AlertSink>,
    config: AccuracyConfig,
    policy: FetchPolicy,
}

impl AccuracyTracker {
    pub fn new(
        history: Arc<dyn HistoricalDataSource>,
        store: Arc<dyn AccuracyStore>,
        alerts: Arc<dyn AlertSink>,
        config: AccuracyConfig,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            history,
            store,
            alerts,
            config,
            policy,
        }
    }

    pub fn config(&self) -> &AccuracyConfig {
        &self.config
    }

    /// Score `period` against its realised actuals.
    ///
    /// # Errors
    /// `UpstreamUnavailable` when history cannot be fetched and
    /// `InsufficientData` when the period has no actuals yet. Persistence
    /// and alert failures are logged and reported on the outcome instead.
    pub async fn run(&self, period: PeriodKey, now: NaiveDateTime) -> Result<TrackingOutcome> {
        let window = self.config.fallback_window.max(1);
        let from = period.offset(-(window as i32));

        let points = self
            .policy
            .attempt("accuracy history", || self.history.fetch_history(from, period))
            .await?;
        let series = HistoricalSeries::from_unsorted(points)?;
        let actual = series.get(period).ok_or_else(|| {
            ForecastError::InsufficientData(format!("no actuals recorded for {period}"))
        })?;
        let actual_units = actual.units_completed as f64;
        let actual_value = actual.value_total;

        let stored = match self
            .policy
            .attempt("stored forecast", || self.store.stored_forecast(period))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("could not read stored forecast for {period}, reconstructing: {e}");
                None
            }
        };

        let (predicted_units, predicted_value, model_used, forecast_source) = match stored {
            Some(snapshot) => (
                snapshot.predicted_units,
                snapshot.predicted_value,
                snapshot.model_used,
                ForecastSource::StoredRecord,
            ),
            None => {
                let prior = series.before(period);
                let model = TrailingAverageModel::new(window);
                let units = model.fit(&prior.units()).forecast;
                let value = model.fit(&prior.values()).forecast;
                log::debug!(
                    "{period}: no stored forecast, {} over {} months gives {units:.1} units",
                    model.name(),
                    prior.len()
                );
                (
                    units,
                    value,
                    model.name().to_string(),
                    ForecastSource::RetrospectiveMovingAverage,
                )
            }
        };

        let units_mape = percentage_error(predicted_units, actual_units);
        let value_mape = percentage_error(predicted_value, actual_value);
        let alert_triggered = units_mape > self.config.alert_threshold_pct;

        let record = AccuracyRecord {
            period_key: period,
            predicted_units,
            actual_units,
            predicted_value,
            actual_value,
            units_mape,
            value_mape,
            accuracy_pct: accuracy_from_error(units_mape),
            model_used,
            alert_triggered,
            calculated_at: now,
        };

        let persisted = match self
            .policy
            .attempt("accuracy upsert", || self.store.upsert_record(record.clone()))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                let failure = ForecastError::PersistenceFailure(e.to_string());
                log::warn!("accuracy record for {period} not saved: {failure}");
                false
            }
        };

        let (alert, alert_delivered) = if alert_triggered {
            let alert = self.build_alert(&record);
            let delivered = match self.alerts.create_alert(alert.clone()).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("accuracy alert for {period} not delivered: {e}");
                    false
                }
            };
            (Some(alert), delivered)
        } else {
            (None, false)
        };

        log::info!(
            "accuracy for {period}: {:.1}% (units MAPE {units_mape:.1}%, {:?})",
            record.accuracy_pct,
            forecast_source
        );

        Ok(TrackingOutcome {
            record,
            forecast_source,
            persisted,
            alert,
            alert_delivered,
        })
    }

    /// Summary of the last `limit` records
    pub async fn trend(&self, limit: usize) -> Result<AccuracyTrend> {
        let records = self
            .policy
            .attempt("accuracy trend", || self.store.recent_records(limit))
            .await?;
        Ok(AccuracyTrend::from_records(&records))
    }

    fn build_alert(&self, record: &AccuracyRecord) -> AlertRequest {
        let severity = if record.units_mape > self.config.critical_threshold_pct {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        AlertRequest {
            alert_type: "forecast_accuracy".to_string(),
            title: format!("Forecast accuracy degraded for {}", record.period_key),
            description: format!(
                "Predicted {:.0} units against {:.0} actual ({:.1}% error, threshold {:.0}%)",
                record.predicted_units,
                record.actual_units,
                record.units_mape,
                self.config.alert_threshold_pct
            ),
            severity,
            context: json!({
                "period_key": record.period_key,
                "predicted_units": record.predicted_units,
                "actual_units": record.actual_units,
                "units_mape": record.units_mape,
                "value_mape": record.value_mape,
                "model_used": record.model_used,
            }),
            suggested_actions: SUGGESTED_ACTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(period: &str, units_mape: f64, alert: bool) -> AccuracyRecord {
        AccuracyRecord {
            period_key: period.parse().unwrap(),
            predicted_units: 100.0,
            actual_units: 100.0,
            predicted_value: 1000.0,
            actual_value: 1000.0,
            units_mape,
            value_mape: units_mape / 2.0,
            accuracy_pct: 100.0 - units_mape,
            model_used: "test".to_string(),
            alert_triggered: alert,
            calculated_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_trend_improving() {
        // most recent first
        let records = vec![
            record("2024-04", 5.0, false),
            record("2024-03", 10.0, false),
            record("2024-02", 30.0, true),
            record("2024-01", 40.0, true),
        ];
        let trend = AccuracyTrend::from_records(&records);
        assert_eq!(trend.periods, 4);
        assert_eq!(trend.alerts, 2);
        assert_eq!(trend.improving, Some(true));
        assert!((trend.mean_units_mape - 21.25).abs() < 1e-12);
    }

    #[test]
    fn test_trend_empty_and_single() {
        assert_eq!(AccuracyTrend::from_records(&[]).improving, None);
        let single = AccuracyTrend::from_records(&[record("2024-01", 12.0, false)]);
        assert_eq!(single.periods, 1);
        assert_eq!(single.improving, None);
    }
}
