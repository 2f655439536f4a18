/// Calendar assembly
///
/// Builds the per-day view of which habits were due and which were done.
/// Past days are rendered with the habit as it was then: the live definition
/// is used from the habit's currently effective version onwards, earlier days
/// go through the version history, and completions of habits that have since
/// been edited away or deleted are still shown.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CompletionMap, Habit, HabitId, HabitVersion, VersionIndex};

/// One habit on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: HabitId,
    pub title: String,
    pub completed: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub habits: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub days: Vec<CalendarDay>,
}

/// Composes live habits, version history and completions into days
pub struct CalendarAssembler<'a> {
    habits: &'a [Habit],
    versions: &'a VersionIndex,
    completions: &'a CompletionMap,
    today: NaiveDate,
}

impl<'a> CalendarAssembler<'a> {
    pub fn new(
        habits: &'a [Habit],
        versions: &'a VersionIndex,
        completions: &'a CompletionMap,
        today: NaiveDate,
    ) -> Self {
        Self {
            habits,
            versions,
            completions,
            today,
        }
    }

    /// Every day of `[start, end]`, in order
    pub fn assemble(&self, start: NaiveDate, end: NaiveDate) -> CalendarResponse {
        let days = start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|day| self.day(day))
            .collect();

        CalendarResponse { days }
    }

    pub fn day(&self, date: NaiveDate) -> CalendarDay {
        let mut seen: HashSet<HabitId> = HashSet::new();
        let mut entries = Vec::new();

        for habit in self.habits {
            let entry = if self.uses_live_definition(habit, date) {
                habit.is_due_on(date).then(|| self.live_entry(habit, date))
            } else {
                match self.versions.snapshot_for(&habit.id, date) {
                    Some(version) => version
                        .is_due_on(date)
                        .then(|| self.version_entry(version, self.completions.contains(date, &habit.id))),
                    None => habit.is_due_on(date).then(|| self.live_entry(habit, date)),
                }
            };

            if let Some(entry) = entry {
                seen.insert(habit.id);
                entries.push(entry);
            }
        }

        // Completed habits with no row yet: edited since, or deleted
        if date < self.today {
            for habit_id in self.completions.habits_on(date) {
                if seen.contains(habit_id) {
                    continue;
                }
                // Without a covering version there is no record of how it looked then
                if let Some(version) = self.versions.snapshot_for(habit_id, date) {
                    seen.insert(*habit_id);
                    entries.push(self.version_entry(version, true));
                }
            }
        }

        CalendarDay { date, habits: entries }
    }

    /// Live rows are used from today on, and from the version in force onwards
    fn uses_live_definition(&self, habit: &Habit, date: NaiveDate) -> bool {
        if date >= self.today {
            return true;
        }
        match self.versions.effective_from(&habit.id) {
            Some(effective_from) => date >= effective_from,
            None => true,
        }
    }

    fn live_entry(&self, habit: &Habit, date: NaiveDate) -> CalendarEntry {
        CalendarEntry {
            id: habit.id,
            title: habit.title.clone(),
            completed: self.completions.contains(date, &habit.id),
            color: habit.color.clone(),
        }
    }

    fn version_entry(&self, version: &HabitVersion, completed: bool) -> CalendarEntry {
        CalendarEntry {
            id: version.habit_id,
            title: version.snapshot.title.clone(),
            completed,
            color: version.snapshot.color.clone(),
        }
    }
}
