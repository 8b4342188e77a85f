//! Monthly reporting periods

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, written `YYYY-MM`.
///
/// Orders chronologically, which matches the lexical order of the string
/// form for four-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ForecastError::DataError(format!(
                "invalid period {year}-{month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Period containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1 through 12
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Zero-based position in the yearly cycle
    pub fn month_index(&self) -> usize {
        (self.month - 1) as usize
    }

    /// Period `months` away; negative offsets go back in time
    pub fn offset(&self, months: i32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: total.div_euclid(12),
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    pub fn prev(&self) -> Self {
        self.offset(-1)
    }

    /// Signed number of months from `self` to `other`
    pub fn months_until(&self, other: &PeriodKey) -> i32 {
        (other.year - self.year) * 12 + other.month as i32 - self.month as i32
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.next().first_day();
        (next - self.first_day()).num_days() as u32
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        PeriodKey::from_date(date) == *self
    }

    /// Fraction of the month elapsed at `instant`, clamped to `[0, 1]`
    pub fn progress_at(&self, instant: NaiveDateTime) -> f64 {
        let start = self.first_day().and_time(chrono::NaiveTime::MIN);
        let end = self.next().first_day().and_time(chrono::NaiveTime::MIN);
        let total = (end - start).num_seconds() as f64;
        let elapsed = (instant - start).num_seconds() as f64;
        (elapsed / total).clamp(0.0, 1.0)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ForecastError::DataError(format!("period key '{s}' is not YYYY-MM"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        PeriodKey::new(year, month)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.to_string()
    }
}
