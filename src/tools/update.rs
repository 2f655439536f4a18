/// Tool for updating existing habits
///
/// This module implements the habit_update MCP tool. Edits that change what
/// the calendar shows (title, color, schedule, active flag) close the current
/// version on the edit day; the new definition takes effect the day after.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{timestamp_on, Habit, HabitUpdate};
use crate::storage::HabitStorage;
use crate::tools::create::{parse_optional_date, parse_schedule_type};
use crate::tools::get::load_habit;
use crate::tools::{Caller, ToolError};

/// Parameters for updating an existing habit; absent fields are left alone
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    pub habit_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Ignored unless positive
    pub target_days: Option<i64>,
    /// Ignored unless positive
    pub daily_goal: Option<i64>,
    pub preferred_time: Option<String>,
    pub category: Option<String>,
    /// Changing the type clears the other schedule field
    pub schedule_type: Option<String>,
    pub recurring_days: Option<Vec<u8>>,
    pub one_time_date: Option<String>,
    pub is_active: Option<bool>,
}

/// Response from updating a habit
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHabitResponse {
    pub habit: Habit,
    /// Whether a new version was opened
    pub new_version: bool,
    pub message: String,
}

/// Update one of the caller's habits as of `today`
pub fn update_habit<S: HabitStorage>(
    storage: &S,
    caller: &Caller,
    params: UpdateHabitParams,
    today: NaiveDate,
) -> Result<UpdateHabitResponse, ToolError> {
    let previous = load_habit(storage, caller, &params.habit_id)?;

    let update = HabitUpdate {
        title: params.title,
        description: params.description,
        color: params.color,
        icon: params.icon,
        target_days: params.target_days,
        daily_goal: params.daily_goal,
        preferred_time: params.preferred_time,
        category: params.category,
        schedule_type: parse_schedule_type(params.schedule_type.as_deref())?,
        recurring_days: params.recurring_days,
        one_time_date: parse_optional_date(params.one_time_date.as_deref())?,
        is_active: params.is_active,
    };
    if update.is_empty() {
        return Err(ToolError::Validation("No fields to update".to_string()));
    }

    let mut habit = previous.clone();
    let new_version = habit.apply_update(update, timestamp_on(today))?;
    storage.update_habit(&previous, &habit, today, new_version)?;

    let message = match (previous.is_active, habit.is_active) {
        (true, false) => format!("Paused habit '{}'", habit.title),
        (false, true) => format!("Reactivated habit '{}'", habit.title),
        _ => format!("Updated habit '{}'", habit.title),
    };

    Ok(UpdateHabitResponse {
        habit,
        new_version,
        message,
    })
}
