use approx::assert_abs_diff_eq;
use demand_forecast::data::{HistoricalPoint, HistoricalSeries};
use demand_forecast::validator::{ConfidenceLabel, ForecastValidator, TrailingStats};
use demand_forecast::PeriodKey;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn flat_history(months: usize, units: u64, value: f64) -> HistoricalSeries {
    let start: PeriodKey = "2023-01".parse().unwrap();
    let points = (0..months)
        .map(|i| HistoricalPoint::new(start.offset(i as i32), units, value))
        .collect();
    HistoricalSeries::new(points).unwrap()
}

#[test]
fn test_scenario_clamps_to_upper_bound() {
    let stats = TrailingStats::from_history(&flat_history(12, 100, 10_000.0), 12);
    assert_abs_diff_eq!(stats.average_units, 100.0, epsilon = 1e-12);
    assert_eq!(stats.prior_growth, Some(0.0));

    let outcome = ForecastValidator::default().validate(500.0, 50_000.0, &stats);

    // Range clamp to 180, then the +25% trend band over 100 brings it to 125
    assert!(!outcome.is_valid);
    assert_eq!(outcome.confidence, ConfidenceLabel::Low);
    assert_abs_diff_eq!(outcome.final_units(), 125.0, epsilon = 1e-9);
    assert_eq!(outcome.warnings.len(), 3);
    assert_abs_diff_eq!(outcome.final_value(), 12_500.0, epsilon = 1e-6);
}

#[test]
fn test_trailing_stats_from_history() {
    let start: PeriodKey = "2024-01".parse().unwrap();
    let series = HistoricalSeries::new(vec![
        HistoricalPoint::new(start, 100, 5_000.0),
        HistoricalPoint::new(start.next(), 200, 15_000.0),
    ])
    .unwrap();

    let stats = TrailingStats::from_history(&series, 12);
    assert_abs_diff_eq!(stats.average_units, 150.0, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.value_per_unit.unwrap(), 10_000.0 / 150.0, epsilon = 1e-9);
    assert_eq!(stats.previous_units, Some(200.0));
    assert_abs_diff_eq!(stats.prior_growth.unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_revalidation_is_a_fixed_point() {
    let mut rng = StdRng::seed_from_u64(42);
    let validator = ForecastValidator::default();

    for _ in 0..500 {
        let average_units = rng.gen_range(1.0..1_000.0);
        let value_per_unit = rng.gen_range(5.0..200.0);
        let stats = TrailingStats {
            average_units,
            average_value: average_units * value_per_unit,
            value_per_unit: Some(value_per_unit),
            previous_units: rng.gen_bool(0.9).then(|| average_units * rng.gen_range(0.3..2.5)),
            prior_growth: rng.gen_bool(0.8).then(|| rng.gen_range(-0.5..0.8)),
        };
        let units = rng.gen_range(0.0..average_units * 4.0);
        let value = rng.gen_range(0.0..stats.average_value * 4.0);

        let first = validator.validate(units, value, &stats);
        let second = validator.validate(first.final_units(), first.final_value(), &stats);

        assert!(
            second.adjusted_units.is_none() && second.adjusted_value.is_none(),
            "second pass adjusted {:?} -> {:?} with {stats:?}",
            (first.final_units(), first.final_value()),
            (second.final_units(), second.final_value())
        );
    }
}

#[test]
fn test_no_history_caps_confidence() {
    let outcome = ForecastValidator::default().validate(42.0, 420.0, &TrailingStats::default());
    assert!(outcome.is_valid);
    assert!(!outcome.was_adjusted());
    assert_eq!(outcome.confidence, ConfidenceLabel::Medium);
}
