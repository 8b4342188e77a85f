//! # SLA Calendar
//!
//! Business-hours calendar arithmetic for SLA deadlines.
//! A calendar is a weekly set of working-hour windows plus a list of holiday
//! exceptions. From it this crate computes how many working minutes lie
//! between two instants and where a deadline lands after adding a number of
//! working hours.
//!
//! Malformed rule sets never fail a calculation: a weekday without a usable
//! rule is simply non-working, so no time is credited for it.
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, NaiveTime};
//! use sla_calendar::{standard_week, BusinessCalendar};
//!
//! let rules = standard_week(
//!     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
//!     NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
//! );
//! let calendar = BusinessCalendar::new(&rules, &[]);
//!
//! // Monday 17:00 -> Tuesday 10:00
//! let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(17, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(10, 0, 0).unwrap();
//! assert_eq!(calendar.minutes_between(start, end), 120);
//! ```

use thiserror::Error;

pub mod calendar;
pub mod rules;
pub mod sla;

pub use calendar::{add_working_hours, minutes_between, overdue_minutes, BusinessCalendar};
pub use rules::{standard_week, HolidayException, WorkingHoursRule};
pub use sla::{SlaStatus, SlaWindow};

/// Errors reported by the fallible calendar operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Calendar has no working time: {0}")]
    NoWorkingTime(String),

    #[error("Scan limit of {0} days exceeded before the duration was consumed")]
    ScanLimitExceeded(i64),

    #[error("Invalid working-hours rule: {0}")]
    InvalidRule(String),
}

/// Result type for calendar operations
pub type Result<T> = std::result::Result<T, CalendarError>;
