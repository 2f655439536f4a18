/// Streak calculation and habit statistics
///
/// Streaks are derived on every request from the completion dates and a
/// schedule snapshot; nothing here is persisted.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{HabitId, ScheduleSnapshot};

/// Current and longest streak of a habit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Statistics for one habit, recomputed on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub completed_days: u32,
    pub total_days: u32,
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl HabitStats {
    pub fn new(habit_id: HabitId, completed_days: u32, total_days: u32, streaks: Streaks) -> Self {
        let completion_rate = if total_days > 0 {
            completed_days as f64 / total_days as f64
        } else {
            0.0
        };

        Self {
            habit_id,
            completed_days,
            total_days,
            completion_rate,
            current_streak: streaks.current,
            longest_streak: streaks.longest,
        }
    }
}

pub struct StreakCalculator;

impl StreakCalculator {
    /// Compute the current and longest streak
    ///
    /// The current streak walks back one calendar day at a time from `today`
    /// and stops at the first day that is not scheduled or not completed, so
    /// for schedules with gaps between due days it never exceeds 1.
    pub fn calculate(dates: &[NaiveDate], snapshot: &ScheduleSnapshot, today: NaiveDate) -> Streaks {
        if dates.is_empty() {
            return Streaks::default();
        }

        let completed: BTreeSet<NaiveDate> = dates.iter().copied().collect();

        Streaks {
            current: Self::current_streak(&completed, snapshot, today),
            longest: Self::longest_streak(&completed, snapshot),
        }
    }

    fn current_streak(completed: &BTreeSet<NaiveDate>, snapshot: &ScheduleSnapshot, today: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut check = Some(today);

        while let Some(day) = check {
            if !snapshot.is_active_on(day) || !completed.contains(&day) {
                break;
            }
            streak += 1;
            check = day.pred_opt();
        }

        streak
    }

    fn longest_streak(completed: &BTreeSet<NaiveDate>, snapshot: &ScheduleSnapshot) -> u32 {
        let mut longest = 0;
        let mut run = 0;
        let mut previous: Option<NaiveDate> = None;

        // BTreeSet iterates in ascending order
        for day in completed.iter().copied().filter(|d| snapshot.is_active_on(*d)) {
            run = match previous {
                Some(prev) if prev.succ_opt() == Some(day) => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            previous = Some(day);
        }

        longest
    }
}
