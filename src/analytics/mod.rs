/// Read-side analytics: statistics and the historical calendar
///
/// Everything here is recomputed from storage on each call; no results are
/// cached between requests.

pub mod calendar;

pub use calendar::*;

use chrono::NaiveDate;

use crate::domain::{Habit, HabitStats, OwnerId, Schedule, StreakCalculator, VersionIndex, WorkspaceId};
use crate::storage::{Storage, StorageError};

/// Analytics engine composing storage reads with the pure algorithms
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Completion statistics of a habit as of `today`
    ///
    /// Scheduled days are counted from the creation day through `today`
    /// using the habit's current schedule.
    pub fn habit_stats<S: Storage>(&self, storage: &S, habit: &Habit, today: NaiveDate) -> Result<HabitStats, StorageError> {
        let created_on = habit.created_on();

        let total_days = match &habit.schedule {
            Schedule::Recurring { recurring_days } => {
                storage.count_scheduled_weekdays(created_on, today, recurring_days)?
            }
            Schedule::OneTime { one_time_date } => {
                u32::from(created_on <= *one_time_date && *one_time_date <= today)
            }
        };
        let completed_days = storage.count_completions(&habit.id)?;

        let dates = storage.completion_dates(&habit.id)?;
        let streaks = StreakCalculator::calculate(&dates, &habit.schedule_snapshot(), today);

        tracing::debug!(
            "Stats for habit {}: {}/{} days, streak {} (best {})",
            habit.id,
            completed_days,
            total_days,
            streaks.current,
            streaks.longest
        );
        Ok(HabitStats::new(habit.id, completed_days, total_days, streaks))
    }

    /// Day-by-day calendar for `[start, end]`
    ///
    /// Habits, versions and completions are loaded once for the whole range
    /// and handed to the [`CalendarAssembler`].
    pub fn calendar<S: Storage>(
        &self,
        storage: &S,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<CalendarResponse, StorageError> {
        let habits = storage.list_habits(owner, workspace)?;
        let versions = VersionIndex::new(storage.versions_in_range(owner, workspace, start, end)?);
        let completions = storage.completion_map(owner, workspace, start, end)?;

        tracing::debug!(
            "Assembling calendar {}..{} from {} habits, {} versions",
            start,
            end,
            habits.len(),
            versions.len()
        );

        let assembler = CalendarAssembler::new(&habits, &versions, &completions, today);
        Ok(assembler.assemble(start, end))
    }
}
