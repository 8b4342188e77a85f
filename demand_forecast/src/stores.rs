//! Ready-made port implementations
//!
//! In-memory stores for tests and embedding, plus a CSV-backed history
//! source.

use crate::accuracy::AccuracyRecord;
use crate::config::ForecastParameters;
use crate::data::{DataLoader, HistoricalPoint, HistoricalSeries};
use crate::error::Result;
use crate::period::PeriodKey;
use crate::ports::{
    AccuracyStore, AlertRequest, AlertSink, ConfigurationStore, HistoricalDataSource,
    StoredForecast,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sla_calendar::{HolidayException, WorkingHoursRule};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log::warn!("{what} read lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log::warn!("{what} write lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

fn slice_range(series: &HistoricalSeries, from: PeriodKey, to: PeriodKey) -> Vec<HistoricalPoint> {
    series
        .points()
        .iter()
        .filter(|p| p.period_key >= from && p.period_key <= to)
        .cloned()
        .collect()
}

/// History held in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    series: RwLock<HistoricalSeries>,
}

impl MemoryHistory {
    pub fn new(series: HistoricalSeries) -> Self {
        Self {
            series: RwLock::new(series),
        }
    }

    /// Replace the whole history, e.g. after a month closes
    pub fn replace(&self, series: HistoricalSeries) {
        *write(&self.series, "history") = series;
    }
}

#[async_trait]
impl HistoricalDataSource for MemoryHistory {
    async fn fetch_history(&self, from: PeriodKey, to: PeriodKey) -> Result<Vec<HistoricalPoint>> {
        Ok(slice_range(&read(&self.series, "history"), from, to))
    }
}

/// History loaded once from a CSV file
#[derive(Debug)]
pub struct CsvHistoricalSource {
    series: HistoricalSeries,
}

impl CsvHistoricalSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            series: DataLoader::from_csv(path)?,
        })
    }

    pub fn series(&self) -> &HistoricalSeries {
        &self.series
    }
}

#[async_trait]
impl HistoricalDataSource for CsvHistoricalSource {
    async fn fetch_history(&self, from: PeriodKey, to: PeriodKey) -> Result<Vec<HistoricalPoint>> {
        Ok(slice_range(&self.series, from, to))
    }
}

/// Configuration held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    pub parameters: Option<ForecastParameters>,
    pub rules: Vec<WorkingHoursRule>,
    pub holidays: Vec<HolidayException>,
}

#[async_trait]
impl ConfigurationStore for MemoryConfigStore {
    async fn forecast_parameters(&self) -> Result<Option<ForecastParameters>> {
        Ok(self.parameters)
    }

    async fn working_hours(&self) -> Result<Vec<WorkingHoursRule>> {
        Ok(self.rules.clone())
    }

    async fn holidays(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<HolidayException>> {
        Ok(self
            .holidays
            .iter()
            .filter(|h| h.date >= from && h.date <= to)
            .cloned()
            .collect())
    }
}

/// Accuracy records and forecast snapshots keyed by period
#[derive(Debug, Default)]
pub struct MemoryAccuracyStore {
    forecasts: RwLock<BTreeMap<PeriodKey, StoredForecast>>,
    records: RwLock<BTreeMap<PeriodKey, AccuracyRecord>>,
}

impl MemoryAccuracyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        read(&self.records, "accuracy records").len()
    }
}

#[async_trait]
impl AccuracyStore for MemoryAccuracyStore {
    async fn stored_forecast(&self, period: PeriodKey) -> Result<Option<StoredForecast>> {
        Ok(read(&self.forecasts, "forecast snapshots").get(&period).cloned())
    }

    async fn save_forecast(&self, forecast: StoredForecast) -> Result<()> {
        write(&self.forecasts, "forecast snapshots").insert(forecast.period_key, forecast);
        Ok(())
    }

    async fn get_record(&self, period: PeriodKey) -> Result<Option<AccuracyRecord>> {
        Ok(read(&self.records, "accuracy records").get(&period).cloned())
    }

    async fn upsert_record(&self, record: AccuracyRecord) -> Result<()> {
        write(&self.records, "accuracy records").insert(record.period_key, record);
        Ok(())
    }

    async fn recent_records(&self, limit: usize) -> Result<Vec<AccuracyRecord>> {
        Ok(read(&self.records, "accuracy records")
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Collects alerts instead of delivering them
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: RwLock<Vec<AlertRequest>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<AlertRequest> {
        read(&self.alerts, "alerts").clone()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn create_alert(&self, alert: AlertRequest) -> Result<()> {
        write(&self.alerts, "alerts").push(alert);
        Ok(())
    }
}
