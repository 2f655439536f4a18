/// Tool for deleting habits
///
/// This module implements the habit_delete MCP tool. The live habit and its
/// completions go away; the version history and the archived completion
/// days stay behind so past calendar days still show what was done.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::HabitId;
use crate::storage::HabitStorage;
use crate::tools::get::load_habit;
use crate::tools::{Caller, HabitIdParams, ToolError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteHabitResponse {
    pub habit_id: HabitId,
    /// Completions moved to the history archive
    pub archived_completions: usize,
    pub message: String,
}

/// Delete one of the caller's habits as of `today`
pub fn delete_habit<S: HabitStorage>(
    storage: &S,
    caller: &Caller,
    params: HabitIdParams,
    today: NaiveDate,
) -> Result<DeleteHabitResponse, ToolError> {
    let habit = load_habit(storage, caller, &params.habit_id)?;
    let archived_completions = storage.delete_habit(&habit, today)?;

    Ok(DeleteHabitResponse {
        habit_id: habit.id,
        archived_completions,
        message: format!("Deleted habit '{}'", habit.title),
    })
}
