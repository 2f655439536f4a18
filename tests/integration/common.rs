use chrono::NaiveDate;
use habit_activity_engine::tools::{self, CreateHabitParams, UpdateHabitParams};
use habit_activity_engine::{parse_date, Caller, Habit, OwnerId, SqliteStorage, WorkspaceId};

pub fn date(s: &str) -> NaiveDate {
    parse_date(s).expect("valid test date")
}

pub fn new_caller() -> Caller {
    Caller::new(OwnerId::new(), WorkspaceId::new())
}

pub fn create_params(title: &str, days: Vec<u8>) -> CreateHabitParams {
    CreateHabitParams {
        title: title.to_string(),
        description: None,
        color: None,
        icon: None,
        target_days: None,
        daily_goal: None,
        preferred_time: None,
        category: None,
        schedule_type: None,
        recurring_days: Some(days),
        one_time_date: None,
        is_active: None,
    }
}

pub fn create(storage: &SqliteStorage, caller: &Caller, title: &str, days: Vec<u8>, on: &str) -> Habit {
    tools::create_habit(storage, caller, create_params(title, days), date(on))
        .expect("habit created")
        .habit
}

pub fn update_params(habit: &Habit) -> UpdateHabitParams {
    UpdateHabitParams {
        habit_id: habit.id.to_string(),
        title: None,
        description: None,
        color: None,
        icon: None,
        target_days: None,
        daily_goal: None,
        preferred_time: None,
        category: None,
        schedule_type: None,
        recurring_days: None,
        one_time_date: None,
        is_active: None,
    }
}
