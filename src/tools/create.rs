/// Tool for creating new habits
///
/// This module implements the habit_create MCP tool.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{parse_date, timestamp_on, Habit, HabitDraft, ScheduleType};
use crate::storage::HabitStorage;
use crate::tools::{Caller, ToolError};

/// Parameters for creating a new habit
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Habit title (1-100 characters)
    pub title: String,
    pub description: Option<String>,
    /// Hex color such as #3B82F6
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Target days per week (defaults to the number of scheduled days)
    pub target_days: Option<u32>,
    pub daily_goal: Option<u32>,
    /// morning, afternoon, evening, any, or a HH:MM time
    pub preferred_time: Option<String>,
    pub category: Option<String>,
    /// recurring (default) or one_time
    pub schedule_type: Option<String>,
    /// Weekdays for recurring habits, 0 = Sunday through 6 = Saturday
    pub recurring_days: Option<Vec<u8>>,
    /// Date of a one-time habit (YYYY-MM-DD)
    pub one_time_date: Option<String>,
    pub is_active: Option<bool>,
}

/// Response from creating a habit
#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub habit: Habit,
    pub message: String,
}

pub(crate) fn parse_schedule_type(raw: Option<&str>) -> Result<Option<ScheduleType>, ToolError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => ScheduleType::parse(s).map(Some).ok_or_else(|| {
            ToolError::Validation(format!("Invalid schedule type '{}'. Valid options: recurring, one_time", s))
        }),
    }
}

pub(crate) fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ToolError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(parse_date(s)?)),
    }
}

/// Create a new habit owned by the caller
///
/// The habit's first version opens on `today`, its creation day.
pub fn create_habit<S: HabitStorage>(
    storage: &S,
    caller: &Caller,
    params: CreateHabitParams,
    today: NaiveDate,
) -> Result<CreateHabitResponse, ToolError> {
    let draft = HabitDraft {
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

    let habit = Habit::new(caller.owner_id, caller.workspace_id, draft, timestamp_on(today))?;
    storage.create_habit(&habit)?;

    Ok(CreateHabitResponse {
        message: format!("Created habit '{}'", habit.title),
        habit,
    })
}
