/// Tool for habit statistics
///
/// This module implements the habit_stats MCP tool: completion counts, rate
/// and streaks of one habit as of today.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::AnalyticsEngine;
use crate::domain::HabitStats;
use crate::storage::Storage;
use crate::tools::get::load_habit;
use crate::tools::{Caller, HabitIdParams, ToolError};

#[derive(Debug, Serialize)]
pub struct HabitStatsResponse {
    pub title: String,
    #[serde(flatten)]
    pub stats: HabitStats,
}

pub fn get_habit_stats<S: Storage>(
    storage: &S,
    analytics: &AnalyticsEngine,
    caller: &Caller,
    params: HabitIdParams,
    today: NaiveDate,
) -> Result<HabitStatsResponse, ToolError> {
    let habit = load_habit(storage, caller, &params.habit_id)?;
    let stats = analytics.habit_stats(storage, &habit, today)?;

    Ok(HabitStatsResponse {
        title: habit.title,
        stats,
    })
}
