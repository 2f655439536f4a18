/// End-to-end habit lifecycles: create, complete, edit, pause, delete
use habit_activity_engine::tools::{self, CalendarParams, HabitIdParams, ListHabitsParams, ToggleHabitParams};
use habit_activity_engine::{AnalyticsEngine, CalendarResponse, Caller, CompletionStore, ErrorKind, SqliteStorage, VersionStore};

use crate::common::{create, date, new_caller, update_params};

fn calendar(storage: &SqliteStorage, caller: &Caller, start: &str, end: &str, today: &str) -> CalendarResponse {
    let params = CalendarParams {
        start_date: Some(start.to_string()),
        end_date: Some(end.to_string()),
    };
    tools::get_calendar(storage, &AnalyticsEngine::new(), caller, params, date(today)).unwrap()
}

fn rows<'a>(calendar: &'a CalendarResponse, day: &str) -> Vec<(&'a str, bool)> {
    calendar
        .days
        .iter()
        .find(|d| d.date == date(day))
        .map(|d| d.habits.iter().map(|h| (h.title.as_str(), h.completed)).collect())
        .unwrap_or_default()
}

#[test]
fn test_mon_wed_fri_streak_scenario() {
    let storage = SqliteStorage::in_memory().unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "Gym", vec![1, 3, 5], "2024-01-01");

    let snapshot = habit.schedule_snapshot();
    assert!(snapshot.is_active_on(date("2024-01-01")));
    assert!(!snapshot.is_active_on(date("2023-12-25")));

    for day in ["2024-01-03", "2024-01-05"] {
        let params = ToggleHabitParams {
            habit_id: habit.id.to_string(),
            date: Some(day.to_string()),
        };
        assert!(tools::toggle_habit(&storage, &caller, params, date("2024-01-05")).unwrap().completed);
    }

    let stats = tools::get_habit_stats(
        &storage,
        &AnalyticsEngine::new(),
        &caller,
        HabitIdParams { habit_id: habit.id.to_string() },
        date("2024-01-05"),
    )
    .unwrap()
    .stats;

    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 1);
    assert_eq!(stats.total_days, 3);
    assert_eq!(stats.completed_days, 2);
}

#[test]
fn test_rename_keeps_history_accurate() {
    let storage = SqliteStorage::in_memory().unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "A", vec![0, 1, 2, 3, 4, 5, 6], "2024-03-01");
    storage.toggle(&habit, date("2024-03-05")).unwrap();

    let mut rename = update_params(&habit);
    rename.title = Some("B".to_string());
    tools::update_habit(&storage, &caller, rename, date("2024-03-06")).unwrap();

    let view = calendar(&storage, &caller, "2024-03-05", "2024-03-06", "2024-03-06");
    assert_eq!(rows(&view, "2024-03-05"), vec![("A", true)]);
    assert_eq!(rows(&view, "2024-03-06"), vec![("B", false)]);

    // Once the rename day is in the past it still shows the old title
    let later = calendar(&storage, &caller, "2024-03-06", "2024-03-08", "2024-03-08");
    assert_eq!(rows(&later, "2024-03-06"), vec![("A", false)]);
    assert_eq!(rows(&later, "2024-03-07"), vec![("B", false)]);
}

#[test]
fn test_deleted_habit_stays_in_the_past() {
    let storage = SqliteStorage::in_memory().unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "Journal", vec![0, 1, 2, 3, 4, 5, 6], "2024-01-01");
    storage.toggle(&habit, date("2024-01-20")).unwrap();

    tools::delete_habit(
        &storage,
        &caller,
        HabitIdParams { habit_id: habit.id.to_string() },
        date("2024-02-01"),
    )
    .unwrap();

    let past = calendar(&storage, &caller, "2024-01-15", "2024-01-25", "2024-02-10");
    assert_eq!(past.days.len(), 11);
    for day in &past.days {
        let expected = if day.date == date("2024-01-20") { vec![("Journal", true)] } else { vec![] };
        assert_eq!(rows(&past, &day.date.to_string()), expected);
    }

    let after = calendar(&storage, &caller, "2024-02-02", "2024-02-10", "2024-02-10");
    assert!(after.days.iter().all(|d| d.habits.is_empty()));

    let history = storage.versions_for(&habit.id).unwrap();
    assert_eq!(history.last().and_then(|v| v.valid_to), Some(date("2024-02-01")));
}

#[test]
fn test_schedule_change_applies_from_next_day() {
    let storage = SqliteStorage::in_memory().unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "Yoga", vec![1, 3, 5], "2024-01-01");

    let mut weekends = update_params(&habit);
    weekends.recurring_days = Some(vec![0, 6]);
    let updated = tools::update_habit(&storage, &caller, weekends, date("2024-01-10")).unwrap();
    assert!(updated.new_version);
    assert_eq!(updated.habit.target_days, 2);

    let view = calendar(&storage, &caller, "2024-01-08", "2024-01-15", "2024-01-20");
    // Mon 8th and Wed 10th under the old schedule
    assert_eq!(rows(&view, "2024-01-08"), vec![("Yoga", false)]);
    assert_eq!(rows(&view, "2024-01-10"), vec![("Yoga", false)]);
    // Fri 12th would have been due before the change
    assert!(rows(&view, "2024-01-12").is_empty());
    assert_eq!(rows(&view, "2024-01-13"), vec![("Yoga", false)]);
    assert!(rows(&view, "2024-01-15").is_empty());
}

#[test]
fn test_paused_habit_leaves_daily_list() {
    let storage = SqliteStorage::in_memory().unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "Piano", vec![0, 1, 2, 3, 4, 5, 6], "2024-01-01");

    let mut pause = update_params(&habit);
    pause.is_active = Some(false);
    tools::update_habit(&storage, &caller, pause, date("2024-01-10")).unwrap();

    let listed = tools::list_habits(&storage, &caller, ListHabitsParams { date: Some("2024-01-15".into()) }).unwrap();
    assert_eq!(listed.total, 0);
    let everything = tools::list_habits(&storage, &caller, ListHabitsParams::default()).unwrap();
    assert_eq!(everything.total, 1);

    let view = calendar(&storage, &caller, "2024-01-09", "2024-01-12", "2024-01-20");
    assert_eq!(rows(&view, "2024-01-09"), vec![("Piano", false)]);
    assert_eq!(rows(&view, "2024-01-10"), vec![("Piano", false)]);
    assert!(rows(&view, "2024-01-11").is_empty());
}

#[test]
fn test_workspaces_do_not_see_each_other() {
    let storage = SqliteStorage::in_memory().unwrap();
    let alice = new_caller();
    let habit = create(&storage, &alice, "Secret", vec![0, 1, 2, 3, 4, 5, 6], "2024-01-01");
    storage.toggle(&habit, date("2024-01-02")).unwrap();

    let other_workspace = Caller::new(alice.owner_id, new_caller().workspace_id);
    let view = calendar(&storage, &other_workspace, "2024-01-01", "2024-01-05", "2024-01-05");
    assert!(view.days.iter().all(|d| d.habits.is_empty()));

    let params = ToggleHabitParams {
        habit_id: habit.id.to_string(),
        date: None,
    };
    let err = tools::toggle_habit(&storage, &other_workspace, params, date("2024-01-05")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
