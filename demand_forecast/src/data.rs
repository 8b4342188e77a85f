//! Monthly historical series handling

use crate::error::{ForecastError, Result};
use crate::period::PeriodKey;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Closed-month totals for completed services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub period_key: PeriodKey,
    pub units_completed: u64,
    pub value_total: f64,
}

impl HistoricalPoint {
    pub fn new(period_key: PeriodKey, units_completed: u64, value_total: f64) -> Self {
        Self {
            period_key,
            units_completed,
            value_total,
        }
    }

    /// Average value per completed unit, `None` for an empty month
    pub fn value_per_unit(&self) -> Option<f64> {
        if self.units_completed == 0 {
            None
        } else {
            Some(self.value_total / self.units_completed as f64)
        }
    }
}

/// Ordered monthly history with at most one point per month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    points: Vec<HistoricalPoint>,
}

impl HistoricalSeries {
    /// Create a series from points already in period order.
    ///
    /// # Errors
    /// `DataError` for out-of-order or duplicate periods and for negative or
    /// non-finite values.
    pub fn new(points: Vec<HistoricalPoint>) -> Result<Self> {
        for point in &points {
            if !point.value_total.is_finite() || point.value_total < 0.0 {
                return Err(ForecastError::DataError(format!(
                    "period {} has invalid value total {}",
                    point.period_key, point.value_total
                )));
            }
        }

        for pair in points.windows(2) {
            if pair[1].period_key <= pair[0].period_key {
                return Err(ForecastError::DataError(format!(
                    "period {} follows {}; periods must be strictly increasing",
                    pair[1].period_key, pair[0].period_key
                )));
            }
        }

        Ok(Self { points })
    }

    /// Sort `points` by period, then validate
    pub fn from_unsorted(mut points: Vec<HistoricalPoint>) -> Result<Self> {
        points.sort_by_key(|p| p.period_key);
        Self::new(points)
    }

    pub fn points(&self) -> &[HistoricalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_period(&self) -> Option<PeriodKey> {
        self.points.first().map(|p| p.period_key)
    }

    pub fn last_period(&self) -> Option<PeriodKey> {
        self.points.last().map(|p| p.period_key)
    }

    pub fn get(&self, period: PeriodKey) -> Option<&HistoricalPoint> {
        self.points
            .binary_search_by_key(&period, |p| p.period_key)
            .ok()
            .map(|i| &self.points[i])
    }

    /// Unit counts as floats, in period order
    pub fn units(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.units_completed as f64)
            .collect()
    }

    /// Value totals, in period order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value_total).collect()
    }

    /// Points strictly before `period`
    pub fn before(&self, period: PeriodKey) -> HistoricalSeries {
        let end = self.points.partition_point(|p| p.period_key < period);
        Self {
            points: self.points[..end].to_vec(),
        }
    }

    /// The last `n` points (fewer if the series is shorter)
    pub fn trailing(&self, n: usize) -> &[HistoricalPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Months between the first and last point that have no data
    pub fn missing_periods(&self) -> Vec<PeriodKey> {
        let mut missing = Vec::new();
        for pair in self.points.windows(2) {
            let mut period = pair[0].period_key.next();
            while period < pair[1].period_key {
                missing.push(period);
                period = period.next();
            }
        }
        missing
    }

    /// Copy of the series with every gap filled from the preceding month
    pub fn fill_gaps(&self) -> HistoricalSeries {
        let mut filled: Vec<HistoricalPoint> = Vec::with_capacity(self.points.len());
        for point in &self.points {
            if let Some(prev) = filled.last().cloned() {
                let mut period = prev.period_key.next();
                while period < point.period_key {
                    filled.push(HistoricalPoint {
                        period_key: period,
                        ..prev.clone()
                    });
                    period = period.next();
                }
            }
            filled.push(point.clone());
        }
        Self { points: filled }
    }
}

/// Loader for historical series files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a series from a CSV file with a
    /// `period_key,units_completed,value_total` header
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<HistoricalSeries> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a series from any CSV reader; rows may be in any order
    pub fn from_reader<R: Read>(reader: R) -> Result<HistoricalSeries> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for row in csv_reader.deserialize::<HistoricalPoint>() {
            points.push(row?);
        }

        HistoricalSeries::from_unsorted(points)
    }
}
