//! Weekly working-hour rules and holiday exceptions

use crate::{CalendarError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Working window for one weekday.
///
/// `weekday` counts from Sunday: 0 = Sunday, 1 = Monday, ... 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursRule {
    /// Day of the week, 0 (Sunday) through 6 (Saturday)
    pub weekday: u8,
    /// Start of the working window
    pub start_time: NaiveTime,
    /// End of the working window
    pub end_time: NaiveTime,
    /// Whether any work happens on this weekday
    pub is_working_day: bool,
}

impl WorkingHoursRule {
    /// Create a working-day rule
    pub fn working(weekday: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
            is_working_day: true,
        }
    }

    /// Create a rule that marks the weekday as non-working
    pub fn closed(weekday: u8) -> Self {
        Self {
            weekday,
            start_time: NaiveTime::MIN,
            end_time: NaiveTime::MIN,
            is_working_day: false,
        }
    }

    /// Check that the rule is usable.
    ///
    /// A working rule must name a weekday in 0..=6 and end after it starts.
    pub fn validate(&self) -> Result<()> {
        if self.weekday > 6 {
            return Err(CalendarError::InvalidRule(format!(
                "weekday {} is outside 0..=6",
                self.weekday
            )));
        }

        if self.is_working_day && self.end_time <= self.start_time {
            return Err(CalendarError::InvalidRule(format!(
                "weekday {} ends at {} which is not after its start {}",
                self.weekday, self.end_time, self.start_time
            )));
        }

        Ok(())
    }

    /// Length of the working window in minutes, zero for closed days
    pub fn working_minutes(&self) -> i64 {
        if !self.is_working_day || self.end_time <= self.start_time {
            return 0;
        }
        (self.end_time - self.start_time).num_minutes()
    }

    /// Working window on a concrete date, if the rule grants one
    pub fn window_on(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if !self.is_working_day || self.end_time <= self.start_time {
            return None;
        }
        Some((date.and_time(self.start_time), date.and_time(self.end_time)))
    }
}

/// A date on which no work happens, whatever the weekday rule says
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolidayException {
    pub date: NaiveDate,
    pub name: String,
}

impl HolidayException {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Monday to Friday between `start` and `end`, weekends closed
pub fn standard_week(start: NaiveTime, end: NaiveTime) -> Vec<WorkingHoursRule> {
    (0..7u8)
        .map(|weekday| match weekday {
            0 | 6 => WorkingHoursRule::closed(weekday),
            _ => WorkingHoursRule::working(weekday, start, end),
        })
        .collect()
}
