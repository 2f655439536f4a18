/// Tool for reading completion history
///
/// This module implements the habit_completions MCP tool: the completions of
/// one habit, or of the whole workspace, over a date range.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{resolve_date_range, Completion};
use crate::storage::{CompletionStore, HabitStorage};
use crate::tools::get::load_habit;
use crate::tools::{Caller, ToolError};

/// Parameters for listing completions
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CompletionsParams {
    /// Limit to one habit; every habit in the workspace when omitted
    pub habit_id: Option<String>,
    /// First day (YYYY-MM-DD); the range defaults to this month through today
    pub start_date: Option<String>,
    /// Last day (YYYY-MM-DD)
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionsResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: usize,
    /// Newest day first
    pub completions: Vec<Completion>,
}

pub fn list_completions<S: HabitStorage + CompletionStore>(
    storage: &S,
    caller: &Caller,
    params: CompletionsParams,
    today: NaiveDate,
) -> Result<CompletionsResponse, ToolError> {
    let (start_date, end_date) = resolve_date_range(params.start_date.as_deref(), params.end_date.as_deref(), today)?;

    let completions = match params.habit_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(raw_id) => {
            let habit = load_habit(storage, caller, raw_id)?;
            storage.completions_in_range(&habit.id, &caller.owner_id, start_date, end_date)?
        }
        None => storage.all_completions_for_workspace_in_range(
            &caller.owner_id,
            &caller.workspace_id,
            start_date,
            end_date,
        )?,
    };

    Ok(CompletionsResponse {
        start_date,
        end_date,
        total: completions.len(),
        completions,
    })
}
