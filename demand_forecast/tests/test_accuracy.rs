use approx::assert_abs_diff_eq;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use demand_forecast::accuracy::{AccuracyRecord, AccuracyTracker, ForecastSource, SUGGESTED_ACTIONS};
use demand_forecast::config::AccuracyConfig;
use demand_forecast::data::{HistoricalPoint, HistoricalSeries};
use demand_forecast::ports::{
    AccuracyStore, AlertRequest, AlertSeverity, AlertSink, HistoricalDataSource, StoredForecast,
};
use demand_forecast::stores::{MemoryAccuracyStore, MemoryAlertSink, MemoryHistory};
use demand_forecast::{FetchPolicy, ForecastError, PeriodKey, Result};
use std::sync::Arc;

fn key(s: &str) -> PeriodKey {
    s.parse().unwrap()
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn quick_policy() -> FetchPolicy {
    FetchPolicy {
        timeout_ms: 100,
        retries: 1,
        backoff_ms: 1,
    }
}

/// Twelve months of 100 units / 10,000 through 2023-12, then `january` for 2024-01
fn history(january: u64) -> Arc<MemoryHistory> {
    let start = key("2023-01");
    let mut points: Vec<HistoricalPoint> = (0..12)
        .map(|i| HistoricalPoint::new(start.offset(i), 100, 10_000.0))
        .collect();
    points.push(HistoricalPoint::new(key("2024-01"), january, january as f64 * 100.0));
    Arc::new(MemoryHistory::new(HistoricalSeries::new(points).unwrap()))
}

fn tracker(
    history: Arc<MemoryHistory>,
    store: Arc<dyn AccuracyStore>,
    alerts: Arc<dyn AlertSink>,
) -> AccuracyTracker {
    AccuracyTracker::new(history, store, alerts, AccuracyConfig::default(), quick_policy())
}

struct BrokenStore;

#[async_trait]
impl AccuracyStore for BrokenStore {
    async fn stored_forecast(&self, _period: PeriodKey) -> Result<Option<StoredForecast>> {
        Err(ForecastError::PersistenceFailure("store offline".into()))
    }

    async fn save_forecast(&self, _forecast: StoredForecast) -> Result<()> {
        Err(ForecastError::PersistenceFailure("store offline".into()))
    }

    async fn get_record(&self, _period: PeriodKey) -> Result<Option<AccuracyRecord>> {
        Err(ForecastError::PersistenceFailure("store offline".into()))
    }

    async fn upsert_record(&self, _record: AccuracyRecord) -> Result<()> {
        Err(ForecastError::PersistenceFailure("store offline".into()))
    }

    async fn recent_records(&self, _limit: usize) -> Result<Vec<AccuracyRecord>> {
        Err(ForecastError::PersistenceFailure("store offline".into()))
    }
}

struct BrokenSink;

#[async_trait]
impl AlertSink for BrokenSink {
    async fn create_alert(&self, _alert: AlertRequest) -> Result<()> {
        Err(ForecastError::PersistenceFailure("notifications offline".into()))
    }
}

struct DownHistory;

#[async_trait]
impl HistoricalDataSource for DownHistory {
    async fn fetch_history(&self, _from: PeriodKey, _to: PeriodKey) -> Result<Vec<HistoricalPoint>> {
        Err(ForecastError::UpstreamUnavailable("warehouse down".into()))
    }
}

#[tokio::test]
async fn test_retrospective_forecast_when_nothing_stored() {
    let store = Arc::new(MemoryAccuracyStore::new());
    let sink = Arc::new(MemoryAlertSink::new());
    let tracker = tracker(history(110), store.clone(), sink.clone());

    let outcome = tracker.run(key("2024-01"), at(1, 2)).await.unwrap();

    assert_eq!(outcome.forecast_source, ForecastSource::RetrospectiveMovingAverage);
    assert_eq!(outcome.record.model_used, "trailing_12_month_average");
    assert_abs_diff_eq!(outcome.record.predicted_units, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(outcome.record.units_mape, 10.0 / 110.0 * 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
        outcome.record.accuracy_pct,
        100.0 - outcome.record.units_mape,
        epsilon = 1e-12
    );
    assert!(outcome.persisted);
    assert!(!outcome.record.alert_triggered);
    assert!(outcome.alert.is_none());
    assert!(sink.alerts().is_empty());
}

#[tokio::test]
async fn test_stored_forecast_is_preferred() {
    let store = Arc::new(MemoryAccuracyStore::new());
    store
        .save_forecast(StoredForecast {
            period_key: key("2024-01"),
            predicted_units: 120.0,
            predicted_value: 12_000.0,
            model_used: "holt_winters".to_string(),
            created_at: at(1, 0),
        })
        .await
        .unwrap();
    let tracker = tracker(history(100), store.clone(), Arc::new(MemoryAlertSink::new()));

    let outcome = tracker.run(key("2024-01"), at(1, 2)).await.unwrap();

    assert_eq!(outcome.forecast_source, ForecastSource::StoredRecord);
    assert_eq!(outcome.record.model_used, "holt_winters");
    assert_abs_diff_eq!(outcome.record.units_mape, 20.0, epsilon = 1e-9);
    assert_abs_diff_eq!(outcome.record.value_mape, 20.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_rerun_overwrites_single_record() {
    let store = Arc::new(MemoryAccuracyStore::new());
    let sink: Arc<dyn AlertSink> = Arc::new(MemoryAlertSink::new());

    let first = tracker(history(100), store.clone(), sink.clone())
        .run(key("2024-01"), at(1, 2))
        .await
        .unwrap();
    let second = tracker(history(125), store.clone(), sink.clone())
        .run(key("2024-01"), at(2, 2))
        .await
        .unwrap();

    assert_eq!(store.record_count(), 1);
    let saved = store.get_record(key("2024-01")).await.unwrap().unwrap();
    assert_eq!(saved, second.record);
    assert_ne!(saved, first.record);
    assert_eq!(saved.actual_units, 125.0);
    assert_eq!(saved.calculated_at, at(2, 2));
}

#[tokio::test]
async fn test_alert_severity_escalates() {
    let sink = Arc::new(MemoryAlertSink::new());

    // predicted 100 against 75 actual: 33% error
    let warning = tracker(history(75), Arc::new(MemoryAccuracyStore::new()), sink.clone())
        .run(key("2024-01"), at(1, 2))
        .await
        .unwrap();
    // predicted 100 against 50 actual: 100% error
    let critical = tracker(history(50), Arc::new(MemoryAccuracyStore::new()), sink.clone())
        .run(key("2024-01"), at(1, 2))
        .await
        .unwrap();

    assert!(warning.record.alert_triggered);
    assert_eq!(warning.alert.as_ref().unwrap().severity, AlertSeverity::Warning);
    assert_eq!(critical.alert.as_ref().unwrap().severity, AlertSeverity::Critical);

    let delivered = sink.alerts();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].suggested_actions.len(), SUGGESTED_ACTIONS.len());
    assert_eq!(delivered[0].alert_type, "forecast_accuracy");
    assert_eq!(delivered[1].context["period_key"], "2024-01");
}

#[tokio::test]
async fn test_persistence_and_alert_failures_are_not_fatal() {
    let tracker = tracker(history(50), Arc::new(BrokenStore), Arc::new(BrokenSink));

    let outcome = tracker.run(key("2024-01"), at(1, 2)).await.unwrap();

    assert!(!outcome.persisted);
    assert!(outcome.record.alert_triggered);
    assert!(outcome.alert.is_some());
    assert!(!outcome.alert_delivered);
    // Unreadable store falls back to reconstruction
    assert_eq!(outcome.forecast_source, ForecastSource::RetrospectiveMovingAverage);
}

#[tokio::test]
async fn test_missing_actuals_is_an_error() {
    let tracker = tracker(
        history(100),
        Arc::new(MemoryAccuracyStore::new()),
        Arc::new(MemoryAlertSink::new()),
    );
    let result = tracker.run(key("2024-02"), at(2, 2)).await;
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[tokio::test]
async fn test_unavailable_history_is_reported() {
    let tracker = AccuracyTracker::new(
        Arc::new(DownHistory),
        Arc::new(MemoryAccuracyStore::new()),
        Arc::new(MemoryAlertSink::new()),
        AccuracyConfig::default(),
        quick_policy(),
    );
    let result = tracker.run(key("2024-01"), at(1, 2)).await;
    assert!(matches!(result, Err(ForecastError::UpstreamUnavailable(_))));
}

#[tokio::test]
async fn test_trend_over_recent_runs() {
    let store = Arc::new(MemoryAccuracyStore::new());
    let sink = Arc::new(MemoryAlertSink::new());
    tracker(history(50), store.clone(), sink.clone())
        .run(key("2024-01"), at(1, 2))
        .await
        .unwrap();

    let trend = tracker(history(50), store.clone(), sink)
        .trend(12)
        .await
        .unwrap();
    assert_eq!(trend.periods, 1);
    assert_eq!(trend.alerts, 1);
    assert_eq!(trend.improving, None);
}
