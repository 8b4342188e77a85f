// Forecasts the open month from two years of in-memory history, scores the
// month that just closed and checks one SLA window against office hours.
use chrono::{NaiveDate, NaiveTime};
use ops_forecast::demand_forecast::config::AccuracyConfig;
use ops_forecast::demand_forecast::stores::{
    MemoryAccuracyStore, MemoryAlertSink, MemoryConfigStore, MemoryHistory,
};
use ops_forecast::demand_forecast::{
    AccuracyTracker, EngineConfig, ForecastEngine, HistoricalPoint, HistoricalSeries, PeriodKey,
};
use ops_forecast::sla_calendar::{standard_week, SlaWindow};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let shape = [
        0.85, 0.9, 1.0, 1.05, 1.1, 1.15, 1.2, 1.1, 1.0, 0.95, 0.9, 1.3,
    ];
    let start: PeriodKey = "2022-03".parse()?;
    let points = (0..24)
        .map(|i| {
            let period = start.offset(i);
            let units = (400.0 * shape[period.month_index()]) as u64;
            HistoricalPoint::new(period, units, units as f64 * 85.0)
        })
        .collect();
    let history = Arc::new(MemoryHistory::new(HistoricalSeries::new(points)?));

    let settings = Arc::new(MemoryConfigStore {
        parameters: None,
        rules: standard_week(
            NaiveTime::from_hms_opt(9, 0, 0).ok_or("bad time")?,
            NaiveTime::from_hms_opt(18, 0, 0).ok_or("bad time")?,
        ),
        holidays: Vec::new(),
    });
    let config = EngineConfig::default();
    let engine = ForecastEngine::new(history.clone(), settings, config.clone());
    let store = Arc::new(MemoryAccuracyStore::new());

    let now = NaiveDate::from_ymd_opt(2024, 3, 12)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .ok_or("bad date")?;
    let result = engine
        .forecast_and_snapshot(store.as_ref(), now, 150.0, 12_900.0)
        .await;

    println!("=== Forecast for {} ===", result.period_key);
    println!("Progress:     {:.0}%", result.diagnostics.period_progress * 100.0);
    println!("Units:        {:.0}", result.period_units);
    println!("Value:        {:.2}", result.period_value);
    println!("Annual units: {:.0}", result.annual_units);
    println!(
        "Confidence:   {:.2} ({})",
        result.confidence, result.accuracy.confidence_label
    );
    for alert in &result.diagnostics.alerts {
        println!("  ! {alert}");
    }

    let tracker = AccuracyTracker::new(
        history,
        store,
        Arc::new(MemoryAlertSink::new()),
        AccuracyConfig::default(),
        config.fetch,
    );
    let closed = result.period_key.prev();
    let outcome = tracker.run(closed, now).await?;
    println!("\n=== Accuracy for {closed} ===");
    println!(
        "Predicted {:.0}, actual {:.0}, accuracy {:.1}% via {}",
        outcome.record.predicted_units,
        outcome.record.actual_units,
        outcome.record.accuracy_pct,
        outcome.record.model_used
    );

    let from = now.date();
    let calendar = engine.load_calendar(from, from + chrono::Duration::days(30)).await;
    let window = SlaWindow::opened_at(now, 16.0, calendar.value());
    println!("\n=== SLA ===");
    println!("Deadline: {}", window.deadline);
    println!("Status:   {:?}", window.status(now, calendar.value()));

    Ok(())
}
