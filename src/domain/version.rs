/// Habit versions
///
/// A version is an immutable copy of a habit's presentation and schedule
/// fields together with the inclusive range of days it was in force.
/// Versions are append-only and outlive the habit they describe.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Category, Habit, HabitId, OwnerId, PreferredTime, Schedule, ScheduleSnapshot, WorkspaceId,
};

/// The versioned fields of a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub title: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub target_days: u32,
    pub daily_goal: u32,
    pub preferred_time: Option<PreferredTime>,
    pub category: Option<Category>,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub is_active: bool,
}

impl VersionSnapshot {
    pub fn of(habit: &Habit) -> Self {
        Self {
            title: habit.title.clone(),
            description: habit.description.clone(),
            color: habit.color.clone(),
            icon: habit.icon.clone(),
            target_days: habit.target_days,
            daily_goal: habit.daily_goal,
            preferred_time: habit.preferred_time,
            category: habit.category.clone(),
            schedule: habit.schedule.clone(),
            is_active: habit.is_active,
        }
    }
}

/// One row of a habit's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitVersion {
    pub id: i64,
    pub habit_id: HabitId,
    #[serde(rename = "userId")]
    pub owner_id: OwnerId,
    pub workspace_id: WorkspaceId,
    #[serde(flatten)]
    pub snapshot: VersionSnapshot,
    pub valid_from: NaiveDate,
    /// `None` while this is the version in force
    pub valid_to: Option<NaiveDate>,
}

impl HabitVersion {
    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }

    /// Whether `date` falls within `[valid_from, valid_to]`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && self.valid_to.map_or(true, |to| date <= to)
    }

    /// Schedule of this version, never active before it took effect
    pub fn schedule_snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot::new(self.snapshot.schedule.clone(), self.valid_from)
    }

    /// Whether the habit, as this version describes it, was due on `date`
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.snapshot.is_active && self.schedule_snapshot().is_active_on(date)
    }
}

/// Pick the version covering `date`
///
/// Intervals do not overlap, but should two cover the same day the one with
/// the latest `valid_from` wins, then the most recently inserted.
pub fn select_version<'a, I>(versions: I, date: NaiveDate) -> Option<&'a HabitVersion>
where
    I: IntoIterator<Item = &'a HabitVersion>,
{
    versions
        .into_iter()
        .filter(|v| v.covers(date))
        .max_by_key(|v| (v.valid_from, v.id))
}

/// Versions of many habits, loaded once for a range query
#[derive(Debug, Clone, Default)]
pub struct VersionIndex {
    by_habit: HashMap<HabitId, Vec<HabitVersion>>,
}

impl VersionIndex {
    pub fn new(versions: impl IntoIterator<Item = HabitVersion>) -> Self {
        let mut by_habit: HashMap<HabitId, Vec<HabitVersion>> = HashMap::new();
        for version in versions {
            by_habit.entry(version.habit_id).or_default().push(version);
        }
        Self { by_habit }
    }

    pub fn snapshot_for(&self, habit_id: &HabitId, date: NaiveDate) -> Option<&HabitVersion> {
        self.by_habit
            .get(habit_id)
            .and_then(|versions| select_version(versions, date))
    }

    /// First day of the version currently in force, if any
    pub fn effective_from(&self, habit_id: &HabitId) -> Option<NaiveDate> {
        self.by_habit
            .get(habit_id)?
            .iter()
            .filter(|v| v.is_open())
            .map(|v| v.valid_from)
            .max()
    }

    pub fn len(&self) -> usize {
        self.by_habit.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_habit.is_empty()
    }
}
