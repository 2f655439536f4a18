/// Tool for listing habits
///
/// This module implements the habit_list MCP tool.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::Habit;
use crate::storage::HabitStorage;
use crate::tools::create::parse_optional_date;
use crate::tools::{Caller, ToolError};

/// Parameters for listing habits
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListHabitsParams {
    /// Only habits due on this day (YYYY-MM-DD); all habits when omitted
    pub date: Option<String>,
}

/// Response from listing habits
#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub total: usize,
    pub habits: Vec<Habit>,
}

/// List the caller's habits, optionally only those active on a day
///
/// A day filter keeps habits that are not paused, already existed on that
/// day and are scheduled on it.
pub fn list_habits<S: HabitStorage>(
    storage: &S,
    caller: &Caller,
    params: ListHabitsParams,
) -> Result<ListHabitsResponse, ToolError> {
    let date = parse_optional_date(params.date.as_deref())?;

    let habits = match date {
        Some(day) => storage.list_habits_active_on(&caller.owner_id, &caller.workspace_id, day)?,
        None => storage.list_habits(&caller.owner_id, &caller.workspace_id)?,
    };

    Ok(ListHabitsResponse {
        date,
        total: habits.len(),
        habits,
    })
}
