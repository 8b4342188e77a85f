//! SLA windows evaluated against a business calendar

use crate::calendar::BusinessCalendar;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A deadline and, once the work is done, its completion instant.
///
/// Derived per ticket; nothing here is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaWindow {
    pub deadline: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Where an SLA window stands. Minute counts are working minutes and
/// follow the signed convention: overdue amounts are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlaStatus {
    OnTrack { remaining_minutes: i64 },
    Overdue { overdue_minutes: i64 },
    CompletedOnTime { margin_minutes: i64 },
    CompletedLate { overdue_minutes: i64 },
}

impl SlaStatus {
    /// Single signed figure for display: positive is time in hand
    pub fn signed_minutes(&self) -> i64 {
        match *self {
            SlaStatus::OnTrack { remaining_minutes } => remaining_minutes,
            SlaStatus::Overdue { overdue_minutes } => overdue_minutes,
            SlaStatus::CompletedOnTime { margin_minutes } => margin_minutes,
            SlaStatus::CompletedLate { overdue_minutes } => overdue_minutes,
        }
    }

    pub fn is_breached(&self) -> bool {
        matches!(
            self,
            SlaStatus::Overdue { .. } | SlaStatus::CompletedLate { .. }
        )
    }
}

impl SlaWindow {
    pub fn new(deadline: NaiveDateTime) -> Self {
        Self {
            deadline,
            completed_at: None,
        }
    }

    /// Window whose deadline is `sla_hours` working hours after `opened_at`
    pub fn opened_at(opened_at: NaiveDateTime, sla_hours: f64, calendar: &BusinessCalendar) -> Self {
        Self::new(calendar.add_working_hours(opened_at, sla_hours))
    }

    pub fn complete(mut self, at: NaiveDateTime) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Evaluate the window at `now`; completed windows ignore `now`
    pub fn status(&self, now: NaiveDateTime, calendar: &BusinessCalendar) -> SlaStatus {
        match self.completed_at {
            Some(done) if done <= self.deadline => SlaStatus::CompletedOnTime {
                margin_minutes: calendar.remaining_minutes(done, self.deadline),
            },
            Some(done) => SlaStatus::CompletedLate {
                overdue_minutes: calendar.overdue_minutes(self.deadline, done),
            },
            None if now <= self.deadline => SlaStatus::OnTrack {
                remaining_minutes: calendar.remaining_minutes(now, self.deadline),
            },
            None => SlaStatus::Overdue {
                overdue_minutes: calendar.overdue_minutes(self.deadline, now),
            },
        }
    }
}
