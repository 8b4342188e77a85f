use demand_forecast::config::{EngineConfig, LATE_PERIOD_BOOST};
use demand_forecast::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "season_length": 4,
            "blend": {{ "late_period_threshold": 0.8 }},
            "accuracy": {{ "alert_threshold_pct": 15.0 }},
            "fetch": {{ "retries": 3 }}
        }}"#
    )
    .unwrap();

    let config = EngineConfig::from_json_file(file.path()).unwrap();

    assert_eq!(config.season_length, 4);
    assert_eq!(config.blend.late_period_threshold, 0.8);
    assert_eq!(config.blend.late_period_boost, LATE_PERIOD_BOOST);
    assert_eq!(config.accuracy.alert_threshold_pct, 15.0);
    assert_eq!(config.accuracy.critical_threshold_pct, 40.0);
    assert_eq!(config.fetch.retries, 3);
    assert_eq!(config.fetch.timeout_ms, 5_000);
}

#[test]
fn test_empty_document_is_default() {
    assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
}

#[test]
fn test_malformed_document() {
    assert!(matches!(
        EngineConfig::from_json_str("{ \"season_length\": \"twelve\" }"),
        Err(ForecastError::JsonError(_))
    ));
}
