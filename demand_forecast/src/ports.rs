//! Interfaces to the systems around the engine
//!
//! Each port is a plain async request/response contract. Implementations
//! decide how data is stored; the engine only relies on the ordering and
//! uniqueness guarantees documented on each method.

use crate::accuracy::AccuracyRecord;
use crate::config::ForecastParameters;
use crate::data::HistoricalPoint;
use crate::error::Result;
use crate::period::PeriodKey;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sla_calendar::{HolidayException, WorkingHoursRule};

/// Source of closed-month history
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    /// Points for `from..=to`, ordered by period with no duplicates
    async fn fetch_history(&self, from: PeriodKey, to: PeriodKey) -> Result<Vec<HistoricalPoint>>;
}

/// Operator-maintained settings
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Current smoothing parameters, `None` when never configured
    async fn forecast_parameters(&self) -> Result<Option<ForecastParameters>>;

    /// Weekly working-hours rules
    async fn working_hours(&self) -> Result<Vec<WorkingHoursRule>>;

    /// Holidays falling within `from..=to`
    async fn holidays(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<HolidayException>>;
}

/// Forecast made while a period was open, kept for later scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredForecast {
    pub period_key: PeriodKey,
    pub predicted_units: f64,
    pub predicted_value: f64,
    pub model_used: String,
    pub created_at: NaiveDateTime,
}

/// Persistence for forecast snapshots and accuracy records
#[async_trait]
pub trait AccuracyStore: Send + Sync {
    /// Snapshot of the live forecast for `period`, if one was saved
    async fn stored_forecast(&self, period: PeriodKey) -> Result<Option<StoredForecast>>;

    /// Save or replace the snapshot for its period
    async fn save_forecast(&self, forecast: StoredForecast) -> Result<()>;

    async fn get_record(&self, period: PeriodKey) -> Result<Option<AccuracyRecord>>;

    /// Insert or overwrite the record keyed by its period
    async fn upsert_record(&self, record: AccuracyRecord) -> Result<()>;

    /// Up to `limit` records, most recent period first
    async fn recent_records(&self, limit: usize) -> Result<Vec<AccuracyRecord>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Alert handed to the notification system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub alert_type: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub context: serde_json::Value,
    pub suggested_actions: Vec<String>,
}

/// Fire-and-forget alert delivery
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn create_alert(&self, alert: AlertRequest) -> Result<()>;
}
