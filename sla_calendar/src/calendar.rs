//! Working-time arithmetic over a weekly rule set and holiday list

use crate::rules::{HolidayException, WorkingHoursRule};
use crate::{CalendarError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Upper bound on the number of days `add_working_*` will walk.
///
/// Ten years of calendar days. A rule set that grants working time is
/// only exhausted this far out when the holiday list blocks out everything.
pub const DEFAULT_MAX_SCAN_DAYS: i64 = 3_660;

/// Weekly working windows plus holiday exceptions.
///
/// Instants are local business time. The calendar owns no clock; every
/// method is a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    rules: [Option<WorkingHoursRule>; 7],
    holidays: BTreeSet<NaiveDate>,
    max_scan_days: i64,
}

impl BusinessCalendar {
    /// Build a calendar from a rule set and holiday list.
    ///
    /// Rules that fail validation are dropped with a warning, leaving their
    /// weekday non-working. When a weekday has more than one rule the first
    /// one wins.
    pub fn new(rules: &[WorkingHoursRule], holidays: &[HolidayException]) -> Self {
        let mut slots: [Option<WorkingHoursRule>; 7] = [None; 7];

        for rule in rules {
            if let Err(e) = rule.validate() {
                log::warn!("ignoring working-hours rule: {e}");
                continue;
            }
            let slot = &mut slots[rule.weekday as usize];
            if slot.is_some() {
                log::warn!(
                    "duplicate working-hours rule for weekday {}, keeping the first",
                    rule.weekday
                );
                continue;
            }
            *slot = Some(*rule);
        }

        Self {
            rules: slots,
            holidays: holidays.iter().map(|h| h.date).collect(),
            max_scan_days: DEFAULT_MAX_SCAN_DAYS,
        }
    }

    /// Override how many days the forward walk may scan
    pub fn with_scan_limit(mut self, days: i64) -> Self {
        self.max_scan_days = days.max(1);
        self
    }

    /// Rule in force for a weekday (0 = Sunday), if any
    pub fn rule_for(&self, weekday: u8) -> Option<&WorkingHoursRule> {
        self.rules.get(weekday as usize).and_then(Option::as_ref)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Whether any weekday grants working time at all
    pub fn has_working_time(&self) -> bool {
        self.rules
            .iter()
            .flatten()
            .any(|rule| rule.working_minutes() > 0)
    }

    /// Working window for a date, `None` on closed days and holidays
    pub fn window_on(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.is_holiday(date) {
            return None;
        }
        let weekday = date.weekday().num_days_from_sunday() as usize;
        self.rules[weekday].and_then(|rule| rule.window_on(date))
    }

    /// Whether `instant` falls inside a working window (start inclusive, end exclusive)
    pub fn is_working_time(&self, instant: NaiveDateTime) -> bool {
        match self.window_on(instant.date()) {
            Some((start, end)) => start <= instant && instant < end,
            None => false,
        }
    }

    /// Working minutes between `start` and `end`.
    ///
    /// The end days are clipped to the range; the days between them are
    /// counted a whole week at a time, minus any holidays, so the cost
    /// grows with the holiday list rather than the length of the range.
    /// Returns 0 when `start` is not before `end`; see
    /// [`overdue_minutes`](Self::overdue_minutes) for the signed variant.
    pub fn minutes_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        if start >= end {
            return 0;
        }

        let (first, last) = (start.date(), end.date());
        let mut total_seconds = self.clipped_seconds(first, start, end);
        if last > first {
            total_seconds += self.clipped_seconds(last, start, end);
        }
        if let (Some(from), Some(to)) = (first.succ_opt(), last.pred_opt()) {
            if from <= to {
                total_seconds += self.full_day_seconds(from, to);
            }
        }

        total_seconds / 60
    }

    fn clipped_seconds(&self, day: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        match self.window_on(day) {
            Some((window_start, window_end)) => {
                let from = window_start.max(start);
                let to = window_end.min(end);
                if to > from {
                    (to - from).num_seconds()
                } else {
                    0
                }
            }
            None => 0,
        }
    }

    /// Working seconds in `from..=to` with every window taken whole
    fn full_day_seconds(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let days = (to - from).num_days() + 1;
        let weeks = days / 7;
        let weekly: i64 = (0..7).map(|weekday| self.weekday_seconds(weekday)).sum();
        let mut total = weeks * weekly;

        let mut day = from + Duration::days(weeks * 7);
        while day <= to {
            total += self.weekday_seconds(day.weekday().num_days_from_sunday() as usize);
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        let blocked: i64 = self
            .holidays
            .range(from..=to)
            .map(|d| self.weekday_seconds(d.weekday().num_days_from_sunday() as usize))
            .sum();
        total - blocked
    }

    fn weekday_seconds(&self, weekday: usize) -> i64 {
        match self.rules[weekday] {
            Some(rule) if rule.is_working_day && rule.end_time > rule.start_time => {
                (rule.end_time - rule.start_time).num_seconds()
            }
            _ => 0,
        }
    }

    /// Working minutes left before `deadline`, 0 once it has passed
    pub fn remaining_minutes(&self, now: NaiveDateTime, deadline: NaiveDateTime) -> i64 {
        self.minutes_between(now, deadline)
    }

    /// Working minutes elapsed past `deadline`, as a non-positive number.
    ///
    /// The sign matches the dashboard convention where positive means time
    /// left and negative means time overdue. Returns 0 when `now` is not
    /// past the deadline.
    pub fn overdue_minutes(&self, deadline: NaiveDateTime, now: NaiveDateTime) -> i64 {
        -self.minutes_between(deadline, now)
    }

    /// Signed SLA minutes: remaining time if positive, overdue time if negative
    pub fn sla_minutes(&self, deadline: NaiveDateTime, now: NaiveDateTime) -> i64 {
        if now <= deadline {
            self.remaining_minutes(now, deadline)
        } else {
            self.overdue_minutes(deadline, now)
        }
    }

    /// Add working hours to `start`.
    ///
    /// Zero, negative or non-finite durations return `start` unchanged, as
    /// does a calendar with no working time at all.
    pub fn add_working_hours(&self, start: NaiveDateTime, hours: f64) -> NaiveDateTime {
        match self.try_add_working_hours(start, hours) {
            Ok(instant) => instant,
            Err(e) => {
                log::warn!("deadline not advanced from {start}: {e}");
                start
            }
        }
    }

    /// Fallible form of [`add_working_hours`](Self::add_working_hours)
    pub fn try_add_working_hours(&self, start: NaiveDateTime, hours: f64) -> Result<NaiveDateTime> {
        if !hours.is_finite() || hours <= 0.0 {
            return Ok(start);
        }
        self.try_add_working_seconds(start, (hours * 3600.0).round() as i64)
    }

    /// Add whole working minutes to `start`
    pub fn add_working_minutes(&self, start: NaiveDateTime, minutes: i64) -> NaiveDateTime {
        match self.try_add_working_seconds(start, minutes.saturating_mul(60)) {
            Ok(instant) => instant,
            Err(e) => {
                log::warn!("deadline not advanced from {start}: {e}");
                start
            }
        }
    }

    fn try_add_working_seconds(&self, start: NaiveDateTime, seconds: i64) -> Result<NaiveDateTime> {
        if seconds <= 0 {
            return Ok(start);
        }
        if !self.has_working_time() {
            return Err(CalendarError::NoWorkingTime(
                "every weekday is non-working".to_string(),
            ));
        }

        let mut remaining = seconds;
        let mut day = start.date();

        for _ in 0..=self.max_scan_days {
            if let Some((window_start, window_end)) = self.window_on(day) {
                let from = window_start.max(start);
                if from < window_end {
                    let available = (window_end - from).num_seconds();
                    if remaining <= available {
                        return Ok(from + Duration::seconds(remaining));
                    }
                    remaining -= available;
                }
            }
            day = day
                .succ_opt()
                .ok_or(CalendarError::ScanLimitExceeded(self.max_scan_days))?;
        }

        Err(CalendarError::ScanLimitExceeded(self.max_scan_days))
    }

    /// First working instant at or after `instant`
    pub fn next_working_instant(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut day = instant.date();
        for _ in 0..=self.max_scan_days {
            if let Some((window_start, window_end)) = self.window_on(day) {
                let from = window_start.max(instant);
                if from < window_end {
                    return Some(from);
                }
            }
            day = day.succ_opt()?;
        }
        None
    }
}

/// Working minutes between two instants under an ad-hoc rule set
pub fn minutes_between(
    start: NaiveDateTime,
    end: NaiveDateTime,
    rules: &[WorkingHoursRule],
    holidays: &[HolidayException],
) -> i64 {
    BusinessCalendar::new(rules, holidays).minutes_between(start, end)
}

/// Add working hours to an instant under an ad-hoc rule set
pub fn add_working_hours(
    start: NaiveDateTime,
    hours: f64,
    rules: &[WorkingHoursRule],
    holidays: &[HolidayException],
) -> NaiveDateTime {
    BusinessCalendar::new(rules, holidays).add_working_hours(start, hours)
}

/// Working minutes past `deadline` as a non-positive number
pub fn overdue_minutes(
    deadline: NaiveDateTime,
    now: NaiveDateTime,
    rules: &[WorkingHoursRule],
    holidays: &[HolidayException],
) -> i64 {
    BusinessCalendar::new(rules, holidays).overdue_minutes(deadline, now)
}
