/// Schedule resolution
///
/// Decides whether a habit is due on a calendar day. The decision depends
/// only on a schedule snapshot and the date, so the same resolver serves the
/// live definition and any historical version.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::domain::{normalize_date, Schedule};

/// A schedule together with the first day it can apply
///
/// `active_from` is the habit's creation day for the live definition, or a
/// version's `valid_from` for a historical one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub schedule: Schedule,
    pub active_from: NaiveDate,
}

impl ScheduleSnapshot {
    pub fn new(schedule: Schedule, active_from: NaiveDate) -> Self {
        Self { schedule, active_from }
    }

    /// Whether the habit is due on `date`
    ///
    /// Never true before `active_from`, whatever the weekday or date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if date < self.active_from {
            return false;
        }

        match &self.schedule {
            Schedule::Recurring { recurring_days } => recurring_days.contains(date.weekday()),
            Schedule::OneTime { one_time_date } => date == *one_time_date,
        }
    }

    /// Same as [`is_active_on`](Self::is_active_on) for an instant in any zone,
    /// normalized to its UTC day first
    pub fn is_active_at<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        self.is_active_on(normalize_date(instant))
    }

    /// Scheduled days in the inclusive range `[from, to]`
    pub fn scheduled_days_between(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        from.iter_days()
            .take_while(move |day| *day <= to)
            .filter(move |day| self.is_active_on(*day))
    }
}
