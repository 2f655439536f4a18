/// Every day from creation to today is covered by exactly one version
use chrono::{Duration, NaiveDate};
use habit_activity_engine::tools::{self, CreateHabitParams, HabitIdParams, UpdateHabitParams};
use habit_activity_engine::{parse_date, Caller, HabitVersion, OwnerId, SqliteStorage, VersionStore, WorkspaceId};
use proptest::prelude::*;

fn start() -> NaiveDate {
    parse_date("2024-01-01").unwrap()
}

fn covering(history: &[HabitVersion], day: NaiveDate) -> usize {
    history.iter().filter(|v| v.covers(day)).count()
}

fn rename(habit_id: &str, title: String) -> UpdateHabitParams {
    UpdateHabitParams {
        habit_id: habit_id.to_string(),
        title: Some(title),
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn versions_tile_the_habit_lifetime(
        mut edit_offsets in proptest::collection::vec(0i64..60, 0..8),
        trailing in 0i64..10,
        delete in any::<bool>(),
    ) {
        edit_offsets.sort_unstable();

        let storage = SqliteStorage::in_memory().unwrap();
        let caller = Caller::new(OwnerId::new(), WorkspaceId::new());
        let params = CreateHabitParams {
            title: "v0".to_string(),
            description: None,
            color: None,
            icon: None,
            target_days: None,
            daily_goal: None,
            preferred_time: None,
            category: None,
            schedule_type: None,
            recurring_days: Some(vec![1, 2, 3]),
            one_time_date: None,
            is_active: None,
        };
        let habit = tools::create_habit(&storage, &caller, params, start()).unwrap().habit;
        let habit_id = habit.id.to_string();

        // Same-day edits included: each one still changes the title
        for (n, offset) in edit_offsets.iter().enumerate() {
            let day = start() + Duration::days(*offset);
            tools::update_habit(&storage, &caller, rename(&habit_id, format!("v{}", n + 1)), day).unwrap();
        }

        let last_edit = edit_offsets.last().copied().unwrap_or(0);
        let today = start() + Duration::days(last_edit + trailing);
        if delete {
            tools::delete_habit(&storage, &caller, HabitIdParams { habit_id: habit_id.clone() }, today).unwrap();
        }

        let history = storage.versions_for(&habit.id).unwrap();
        let open = history.iter().filter(|v| v.is_open()).count();
        prop_assert_eq!(open, if delete { 0 } else { 1 });

        let mut day = start();
        while day <= today {
            prop_assert_eq!(covering(&history, day), 1, "day {} covered by {:?}", day, history);
            day = day.succ_opt().unwrap();
        }
        if delete {
            prop_assert_eq!(covering(&history, today + Duration::days(1)), 0);
        }
    }
}
