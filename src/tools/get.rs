/// Tool for fetching a single habit
///
/// This module implements the habit_get MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::Habit;
use crate::storage::HabitStorage;
use crate::tools::{parse_habit_id, Caller, ToolError};

/// Parameters naming one habit
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HabitIdParams {
    /// ID of the habit
    pub habit_id: String,
}

#[derive(Debug, Serialize)]
pub struct GetHabitResponse {
    pub habit: Habit,
}

/// Load one of the caller's habits
///
/// Habits of other owners or workspaces are reported as not found.
pub fn get_habit<S: HabitStorage>(
    storage: &S,
    caller: &Caller,
    params: HabitIdParams,
) -> Result<GetHabitResponse, ToolError> {
    let habit = load_habit(storage, caller, &params.habit_id)?;
    Ok(GetHabitResponse { habit })
}

pub(crate) fn load_habit<S: HabitStorage>(storage: &S, caller: &Caller, raw_id: &str) -> Result<Habit, ToolError> {
    let habit_id = parse_habit_id(raw_id)?;
    Ok(storage.get_habit(&habit_id, &caller.owner_id, &caller.workspace_id)?)
}
