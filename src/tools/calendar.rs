/// Tool for the history calendar
///
/// This module implements the habit_calendar MCP tool.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::analytics::{AnalyticsEngine, CalendarResponse};
use crate::domain::resolve_date_range;
use crate::storage::Storage;
use crate::tools::{Caller, ToolError};

/// Longest range the calendar renders, about three years
pub const MAX_CALENDAR_DAYS: i64 = 1098;

/// Parameters for the calendar
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CalendarParams {
    /// First day (YYYY-MM-DD); the range defaults to this month through today
    pub start_date: Option<String>,
    /// Last day (YYYY-MM-DD)
    pub end_date: Option<String>,
}

/// Every day of the range with the habits due on it, as they were then
pub fn get_calendar<S: Storage>(
    storage: &S,
    analytics: &AnalyticsEngine,
    caller: &Caller,
    params: CalendarParams,
    today: NaiveDate,
) -> Result<CalendarResponse, ToolError> {
    let (start, end) = resolve_date_range(params.start_date.as_deref(), params.end_date.as_deref(), today)?;
    let span = (end - start).num_days() + 1;
    if span > MAX_CALENDAR_DAYS {
        return Err(ToolError::Validation(format!(
            "Calendar range covers {} days; at most {} are allowed",
            span, MAX_CALENDAR_DAYS
        )));
    }
    Ok(analytics.calendar(storage, &caller.owner_id, &caller.workspace_id, start, end, today)?)
}
