//! # Ops Forecast
//!
//! Demand forecasting and SLA deadline arithmetic for the operations
//! dashboard. This crate re-exports the workspace members:
//!
//! - [`sla_calendar`]: working-hours calendar and SLA windows
//! - [`forecast_math`]: polynomial trends, linear solver, error metrics
//! - [`demand_forecast`]: monthly forecasting, validation and accuracy tracking
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, NaiveTime};
//! use ops_forecast::sla_calendar::{standard_week, BusinessCalendar};
//!
//! let rules = standard_week(
//!     NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
//!     NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
//! );
//! let calendar = BusinessCalendar::new(&rules, &[]);
//!
//! // Monday 17:00 to Tuesday 10:00
//! let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(17, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap().and_hms_opt(10, 0, 0).unwrap();
//! assert_eq!(calendar.minutes_between(start, end), 120);
//! ```

pub use demand_forecast;
pub use forecast_math;
pub use sla_calendar;

pub use demand_forecast::{
    AccuracyTracker, EngineConfig, ForecastEngine, ForecastResult, ForecastValidator, PeriodKey,
};
pub use sla_calendar::{BusinessCalendar, SlaStatus, SlaWindow};
