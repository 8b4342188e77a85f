use approx::assert_abs_diff_eq;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use demand_forecast::config::{EngineConfig, ForecastParameters};
use demand_forecast::data::{HistoricalPoint, HistoricalSeries};
use demand_forecast::ports::{AccuracyStore, ConfigurationStore, HistoricalDataSource};
use demand_forecast::stores::{MemoryAccuracyStore, MemoryConfigStore, MemoryHistory};
use demand_forecast::{ConfidenceLabel, FetchPolicy, ForecastEngine, ForecastError, PeriodKey, Result};
use sla_calendar::{standard_week, HolidayException, WorkingHoursRule};
use std::sync::Arc;

fn key(s: &str) -> PeriodKey {
    s.parse().unwrap()
}

fn instant(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn config() -> EngineConfig {
    EngineConfig {
        fetch: FetchPolicy {
            timeout_ms: 100,
            retries: 1,
            backoff_ms: 1,
        },
        ..EngineConfig::default()
    }
}

fn flat_history(first: &str, months: i32) -> Arc<MemoryHistory> {
    let start = key(first);
    let points = (0..months)
        .map(|i| HistoricalPoint::new(start.offset(i), 100, 10_000.0))
        .collect();
    Arc::new(MemoryHistory::new(HistoricalSeries::new(points).unwrap()))
}

fn office_hours() -> Arc<MemoryConfigStore> {
    Arc::new(MemoryConfigStore {
        parameters: None,
        rules: standard_week(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        ),
        holidays: vec![HolidayException::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "New Year's Day",
        )],
    })
}

struct Unreachable;

#[async_trait]
impl HistoricalDataSource for Unreachable {
    async fn fetch_history(&self, _from: PeriodKey, _to: PeriodKey) -> Result<Vec<HistoricalPoint>> {
        Err(ForecastError::UpstreamUnavailable("connection refused".into()))
    }
}

#[async_trait]
impl ConfigurationStore for Unreachable {
    async fn forecast_parameters(&self) -> Result<Option<ForecastParameters>> {
        Err(ForecastError::UpstreamUnavailable("connection refused".into()))
    }

    async fn working_hours(&self) -> Result<Vec<WorkingHoursRule>> {
        Err(ForecastError::UpstreamUnavailable("connection refused".into()))
    }

    async fn holidays(&self, _from: NaiveDate, _to: NaiveDate) -> Result<Vec<HolidayException>> {
        Err(ForecastError::UpstreamUnavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_forecast_with_steady_history() {
    let engine = ForecastEngine::new(flat_history("2022-01", 24), office_hours(), config());

    // Half of January gone, 50 units recorded so far
    let result = engine
        .forecast_period(instant(2024, 1, 16), 50.0, 5_000.0)
        .await;

    assert_eq!(result.period_key, key("2024-01"));
    assert_abs_diff_eq!(result.diagnostics.period_progress, 15.0 / 31.0, epsilon = 1e-12);
    assert!(result.period_units > 100.0 && result.period_units < 105.0);
    assert_abs_diff_eq!(result.annual_units, result.period_units + 1_100.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.annual_value, result.period_value + 110_000.0, epsilon = 1e-4);
    assert_eq!(result.accuracy.confidence_label, ConfidenceLabel::High);
    assert_abs_diff_eq!(result.confidence, 1.0, epsilon = 1e-9);
    assert!(result.diagnostics.alerts.is_empty(), "{:?}", result.diagnostics.alerts);
    assert!(result.model_used.starts_with("holt_winters"));
}

#[tokio::test]
async fn test_annual_includes_closed_months_of_the_year() {
    let engine = ForecastEngine::new(flat_history("2022-03", 24), office_hours(), config());

    let result = engine
        .forecast_period(instant(2024, 3, 1), 0.0, 0.0)
        .await;

    // Jan and Feb closed at 100 each, March forecast, nine more at 100
    assert_abs_diff_eq!(result.period_units, 100.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.annual_units, 1_200.0, epsilon = 1e-6);
}

#[tokio::test]
async fn test_unreachable_upstreams_still_forecast() {
    let engine = ForecastEngine::new(Arc::new(Unreachable), Arc::new(Unreachable), config());

    let result = engine
        .forecast_period(instant(2024, 1, 16), 50.0, 5_000.0)
        .await;

    let alerts = result.diagnostics.alerts.join("\n");
    assert!(alerts.contains("forecast parameters unavailable"));
    assert!(alerts.contains("historical data unavailable"));
    assert!(result.period_units >= 50.0);
    assert!(result.period_value >= 5_000.0);
    assert!(result.confidence <= 0.5);
    assert_eq!(result.accuracy.confidence_label, ConfidenceLabel::Low);
}

#[tokio::test]
async fn test_gaps_lower_confidence() {
    let full = ForecastEngine::new(flat_history("2022-01", 24), office_hours(), config());

    let mut points: Vec<HistoricalPoint> = (0..24)
        .map(|i| HistoricalPoint::new(key("2022-01").offset(i), 100, 10_000.0))
        .collect();
    points.retain(|p| !(p.period_key >= key("2023-04") && p.period_key <= key("2023-06")));
    let gappy_history = Arc::new(MemoryHistory::new(HistoricalSeries::new(points).unwrap()));
    let gappy = ForecastEngine::new(gappy_history, office_hours(), config());

    let now = instant(2024, 1, 16);
    let complete = full.forecast_period(now, 50.0, 5_000.0).await;
    let degraded = gappy.forecast_period(now, 50.0, 5_000.0).await;

    assert!(degraded.confidence < complete.confidence);
    assert!(degraded
        .diagnostics
        .alerts
        .iter()
        .any(|a| a.contains("3 month(s) missing")));
}

#[tokio::test]
async fn test_snapshot_is_saved_for_later_scoring() {
    let engine = ForecastEngine::new(flat_history("2022-01", 24), office_hours(), config());
    let store = MemoryAccuracyStore::new();
    let now = instant(2024, 1, 16);

    let result = engine.forecast_and_snapshot(&store, now, 50.0, 5_000.0).await;

    let stored = store.stored_forecast(key("2024-01")).await.unwrap().unwrap();
    assert_eq!(stored.predicted_units, result.period_units);
    assert_eq!(stored.model_used, result.model_used);
    assert_eq!(stored.created_at, now);
}

#[tokio::test]
async fn test_load_calendar() {
    let engine = ForecastEngine::new(flat_history("2022-01", 24), office_hours(), config());
    let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    let loaded = engine.load_calendar(from, to).await;
    assert!(!loaded.is_fallback());
    let calendar = loaded.into_value();
    assert!(calendar.is_holiday(from));
    assert!(calendar.has_working_time());

    let offline = ForecastEngine::new(flat_history("2022-01", 24), Arc::new(Unreachable), config());
    let degraded = offline.load_calendar(from, to).await;
    assert!(degraded.is_fallback());
    assert!(!degraded.value().has_working_time());
}

#[test]
fn test_daily_trend_line() {
    let engine = ForecastEngine::new(flat_history("2022-01", 24), office_hours(), config());
    // Ten days recorded, the rest of the month not yet elapsed
    let mut daily: Vec<f64> = (1..=10).map(|d| 10.0 + 2.0 * d as f64).collect();
    daily.extend([0.0; 5]);

    let line = engine.daily_trend(key("2024-01"), &daily).unwrap();

    assert_eq!(line.len(), 31);
    assert_abs_diff_eq!(line[0], 12.0, epsilon = 1e-6);
    assert_abs_diff_eq!(line[19], 50.0, epsilon = 1e-6);
}

#[test]
fn test_annual_bridges_months_after_stale_history() {
    let engine = ForecastEngine::new(flat_history("2022-04", 24), office_hours(), config());
    let history = HistoricalSeries::new(
        (0..24)
            .map(|i| HistoricalPoint::new(key("2022-04").offset(i), 100, 10_000.0))
            .collect(),
    )
    .unwrap();

    // History ends 2024-03; April and May have no actuals yet
    let result = engine.forecast_from_history(
        key("2024-06"),
        0.0,
        &history,
        ForecastParameters::default(),
        0.0,
        0.0,
        Vec::new(),
    );

    assert_abs_diff_eq!(result.period_units, 100.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.annual_units, 1_200.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.annual_value, 120_000.0, epsilon = 1e-4);
    let alerts = result.diagnostics.alerts.join("\n");
    assert!(alerts.contains("history ends 2 month(s) before 2024-06"));
    assert!(alerts.contains("growth check skipped"));
}

#[test]
fn test_annual_counts_filled_gap_inside_the_year() {
    let engine = ForecastEngine::new(flat_history("2022-03", 24), office_hours(), config());
    let points = (0..24)
        .map(|i| HistoricalPoint::new(key("2022-03").offset(i), 100, 10_000.0))
        .filter(|p| p.period_key != key("2024-01"))
        .collect();
    let history = HistoricalSeries::new(points).unwrap();

    let result = engine.forecast_from_history(
        key("2024-03"),
        0.0,
        &history,
        ForecastParameters::default(),
        0.0,
        0.0,
        Vec::new(),
    );

    assert_abs_diff_eq!(result.annual_units, 1_200.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.annual_value, 120_000.0, epsilon = 1e-4);
    assert!(!result
        .diagnostics
        .alerts
        .iter()
        .any(|a| a.contains("growth check skipped")));
}

#[tokio::test]
async fn test_out_of_range_stored_parameters_fall_back() {
    let settings = Arc::new(MemoryConfigStore {
        parameters: Some(ForecastParameters::manual(1.5, 0.1, 0.1)),
        rules: Vec::new(),
        holidays: Vec::new(),
    });
    let engine = ForecastEngine::new(flat_history("2022-01", 24), settings, config());

    let params = engine.parameters().await;
    assert!(params.is_fallback());
    assert_eq!(params.into_value(), config().parameters);

    let result = engine
        .forecast_period(instant(2024, 1, 16), 50.0, 5_000.0)
        .await;
    assert!(result
        .diagnostics
        .alerts
        .iter()
        .any(|a| a.contains("alpha = 1.5 is outside [0, 1]")));
}
