use demand_forecast::data::{DataLoader, HistoricalPoint, HistoricalSeries};
use demand_forecast::stores::CsvHistoricalSource;
use demand_forecast::ports::HistoricalDataSource;
use demand_forecast::{ForecastError, PeriodKey};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn key(s: &str) -> PeriodKey {
    s.parse().unwrap()
}

fn write_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "period_key,units_completed,value_total").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

#[test]
fn test_data_loader_from_csv() {
    let file = write_csv(&[
        "2024-02, 120, 11800.50",
        "2024-01, 100, 10000.00",
        "2024-03, 130, 13100.00",
    ]);

    let series = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.first_period(), Some(key("2024-01")));
    assert_eq!(series.units(), vec![100.0, 120.0, 130.0]);
    assert_eq!(series.get(key("2024-02")).unwrap().value_total, 11800.5);
}

#[test]
fn test_data_loader_rejects_duplicates() {
    let file = write_csv(&["2024-01,100,10000", "2024-01,90,9000"]);
    let result = DataLoader::from_csv(file.path());
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_data_loader_rejects_bad_period() {
    let file = write_csv(&["2024-13,100,10000"]);
    assert!(matches!(
        DataLoader::from_csv(file.path()),
        Err(ForecastError::CsvError(_))
    ));
}

#[test]
fn test_missing_file() {
    let result = DataLoader::from_csv("/nonexistent/history.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}

#[test]
fn test_gap_filling() {
    let series = HistoricalSeries::new(vec![
        HistoricalPoint::new(key("2023-11"), 80, 8000.0),
        HistoricalPoint::new(key("2024-02"), 110, 11000.0),
    ])
    .unwrap();

    assert_eq!(series.missing_periods(), vec![key("2023-12"), key("2024-01")]);

    let filled = series.fill_gaps();
    assert_eq!(filled.len(), 4);
    assert!(filled.missing_periods().is_empty());
    assert_eq!(filled.units(), vec![80.0, 80.0, 80.0, 110.0]);
}

#[tokio::test]
async fn test_csv_source_fetches_range() {
    let file = write_csv(&[
        "2023-12,90,9000",
        "2024-01,100,10000",
        "2024-02,110,11000",
        "2024-03,120,12000",
    ]);
    let source = CsvHistoricalSource::from_path(file.path()).unwrap();

    let points = source
        .fetch_history(key("2024-01"), key("2024-02"))
        .await
        .unwrap();

    let periods: Vec<String> = points.iter().map(|p| p.period_key.to_string()).collect();
    assert_eq!(periods, vec!["2024-01", "2024-02"]);
}
