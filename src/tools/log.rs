/// Tools for recording habit completions
///
/// This module implements the habit_complete and habit_toggle MCP tools.
/// Both default to today when no date is given.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{parse_date_or, timestamp_on, Completion, CompletionInput};
use crate::storage::{CompletionStore, HabitStorage};
use crate::tools::get::load_habit;
use crate::tools::{Caller, ToolError};

/// Parameters for recording a completion
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompleteHabitParams {
    pub habit_id: String,
    /// Day completed (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
    pub notes: Option<String>,
    /// 1-5; 0 or absent means no rating
    pub rating: Option<i64>,
    /// Time of day, free text such as 07:30
    pub time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteHabitResponse {
    pub completion: Completion,
    pub message: String,
}

/// Parameters for flipping a day's completion
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ToggleHabitParams {
    pub habit_id: String,
    /// Day to toggle (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleHabitResponse {
    /// Whether the day is completed after the toggle
    pub completed: bool,
    /// The record that was created or removed
    pub completion: Completion,
    pub message: String,
}

/// Record a completion, replacing any existing one for that day
pub fn complete_habit<S: HabitStorage + CompletionStore>(
    storage: &S,
    caller: &Caller,
    params: CompleteHabitParams,
    today: NaiveDate,
) -> Result<CompleteHabitResponse, ToolError> {
    let habit = load_habit(storage, caller, &params.habit_id)?;
    let date = parse_date_or(params.date.as_deref(), today)?;

    let input = CompletionInput {
        notes: params.notes,
        rating: params.rating,
        time: params.time,
    };
    let completion = Completion::new(
        habit.id,
        habit.owner_id,
        habit.workspace_id,
        date,
        input,
        timestamp_on(today),
    )?;
    let completion = storage.complete(&completion)?;

    Ok(CompleteHabitResponse {
        message: format!("Completed '{}' on {}", habit.title, date),
        completion,
    })
}

/// Flip whether the habit is completed on a day
pub fn toggle_habit<S: HabitStorage + CompletionStore>(
    storage: &S,
    caller: &Caller,
    params: ToggleHabitParams,
    today: NaiveDate,
) -> Result<ToggleHabitResponse, ToolError> {
    let habit = load_habit(storage, caller, &params.habit_id)?;
    let date = parse_date_or(params.date.as_deref(), today)?;

    let toggled = storage.toggle(&habit, date)?;
    let message = if toggled.added {
        format!("Marked '{}' done on {}", habit.title, date)
    } else {
        format!("Cleared '{}' on {}", habit.title, date)
    };

    Ok(ToggleHabitResponse {
        completed: toggled.added,
        completion: toggled.completion,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures::{date, habit_on, setup};
    use crate::tools::ErrorKind;

    fn complete_params(habit_id: String, day: Option<&str>, rating: Option<i64>) -> CompleteHabitParams {
        CompleteHabitParams {
            habit_id,
            date: day.map(str::to_string),
            notes: Some("  felt good ".to_string()),
            rating,
            time: Some("07:05".to_string()),
        }
    }

    #[test]
    fn test_complete_defaults_to_today() {
        let (storage, caller) = setup();
        let habit = habit_on(&storage, &caller, "Run", vec![1, 3, 5], "2024-01-01");

        let response = complete_habit(
            &storage,
            &caller,
            complete_params(habit.id.to_string(), None, Some(4)),
            date("2024-01-03"),
        )
        .unwrap();
        let completion = response.completion;
        assert_eq!(completion.date, date("2024-01-03"));
        assert_eq!(completion.notes, "felt good");
        assert_eq!(completion.rating.map(|r| r.value()), Some(4));
        assert_eq!(completion.time.as_deref(), Some("07:05:00"));
    }

    #[test]
    fn test_complete_rejects_out_of_range_rating() {
        let (storage, caller) = setup();
        let habit = habit_on(&storage, &caller, "Run", vec![1], "2024-01-01");

        let err = complete_habit(
            &storage,
            &caller,
            complete_params(habit.id.to_string(), Some("2024-01-01"), Some(6)),
            date("2024-01-01"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(storage.count_completions(&habit.id).unwrap(), 0);
    }

    #[test]
    fn test_complete_same_day_twice_keeps_one_record() {
        let (storage, caller) = setup();
        let habit = habit_on(&storage, &caller, "Run", vec![1], "2024-01-01");

        for rating in [Some(2), Some(5)] {
            complete_habit(
                &storage,
                &caller,
                complete_params(habit.id.to_string(), Some("2024-01-01"), rating),
                date("2024-01-02"),
            )
            .unwrap();
        }
        assert_eq!(storage.count_completions(&habit.id).unwrap(), 1);
    }

    #[test]
    fn test_toggle_twice() {
        let (storage, caller) = setup();
        let habit = habit_on(&storage, &caller, "Run", vec![1], "2024-01-01");
        let params = ToggleHabitParams {
            habit_id: habit.id.to_string(),
            date: Some("2024-01-01".to_string()),
        };

        let first = toggle_habit(&storage, &caller, params.clone(), date("2024-01-02")).unwrap();
        assert!(first.completed);
        let second = toggle_habit(&storage, &caller, params, date("2024-01-02")).unwrap();
        assert!(!second.completed);
        assert_eq!(second.completion.id, first.completion.id);
        assert_eq!(storage.count_completions(&habit.id).unwrap(), 0);
    }

    #[test]
    fn test_toggle_foreign_habit_is_not_found() {
        let (storage, caller) = setup();
        let habit = habit_on(&storage, &caller, "Run", vec![1], "2024-01-01");
        let (_, stranger) = setup();

        let params = ToggleHabitParams {
            habit_id: habit.id.to_string(),
            date: None,
        };
        let err = toggle_habit(&storage, &stranger, params, date("2024-01-02")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
