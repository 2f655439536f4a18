/// Schedule, completion and streak rules through the public API
use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};
use habit_activity_engine::{
    normalize_date, parse_date, Completion, CompletionInput, Habit, HabitDraft, HabitId, OwnerId, Schedule,
    ScheduleSnapshot, ScheduleType, StreakCalculator, WorkspaceId,
};
use proptest::prelude::*;

fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn draft(schedule_type: Option<ScheduleType>, days: Option<Vec<u8>>, one_time: Option<NaiveDate>) -> HabitDraft {
    HabitDraft {
        title: "Habit".to_string(),
        schedule_type,
        recurring_days: days,
        one_time_date: one_time,
        ..Default::default()
    }
}

fn build(draft: HabitDraft) -> bool {
    let created_at = date("2024-01-01").and_hms_opt(12, 0, 0).unwrap().and_utc();
    Habit::new(OwnerId::new(), WorkspaceId::new(), draft, created_at).is_ok()
}

#[test]
fn test_schedule_fields_are_mutually_exclusive() {
    assert!(build(draft(None, Some(vec![1]), None)));
    assert!(build(draft(Some(ScheduleType::OneTime), None, Some(date("2024-02-01")))));

    assert!(!build(draft(None, Some(vec![1]), Some(date("2024-02-01")))));
    assert!(!build(draft(None, None, None)));
    assert!(!build(draft(Some(ScheduleType::OneTime), None, None)));
    assert!(!build(draft(Some(ScheduleType::OneTime), Some(vec![2]), None)));
}

#[test]
fn test_out_of_range_weekday_is_rejected() {
    assert!(!build(draft(None, Some(vec![7]), None)));
}

#[test]
fn test_rating_bounds() {
    let make = |rating| {
        let input = CompletionInput {
            rating,
            ..Default::default()
        };
        Completion::new(
            HabitId::new(),
            OwnerId::new(),
            WorkspaceId::new(),
            date("2024-01-01"),
            input,
            chrono::Utc::now(),
        )
    };

    assert!(make(Some(1)).is_ok());
    assert!(make(Some(5)).is_ok());
    assert_eq!(make(Some(0)).unwrap().rating, None);
    assert!(make(Some(6)).is_err());
    assert!(make(Some(-1)).is_err());
}

#[test]
fn test_instants_are_normalized_to_utc_days() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let early_morning = tokyo.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
    assert_eq!(normalize_date(&early_morning), date("2024-01-01"));
}

#[test]
fn test_mon_wed_fri_current_streak_stops_at_gap_day() {
    let schedule = Schedule::from_parts(ScheduleType::Recurring, Some(vec![1, 3, 5]), None).unwrap();
    let snapshot = ScheduleSnapshot::new(schedule, date("2024-01-01"));
    let completions = [date("2024-01-03"), date("2024-01-05")];

    let streaks = StreakCalculator::calculate(&completions, &snapshot, date("2024-01-05"));
    assert_eq!(streaks.current, 1);
    assert_eq!(streaks.longest, 1);
}

proptest! {
    #[test]
    fn daily_streak_counts_trailing_run(run in 1i64..60, gap in 1i64..10) {
        let schedule = Schedule::from_parts(ScheduleType::Recurring, Some(vec![0, 1, 2, 3, 4, 5, 6]), None).unwrap();
        let created = date("2023-01-01");
        let snapshot = ScheduleSnapshot::new(schedule, created);
        let today = date("2023-06-01");

        // An older run of `run` days, a gap, then today alone
        let mut completions: Vec<NaiveDate> = (0..run)
            .map(|i| today - Duration::days(gap + 1 + i))
            .collect();
        completions.push(today);

        let streaks = StreakCalculator::calculate(&completions, &snapshot, today);
        prop_assert_eq!(streaks.current, 1);
        prop_assert_eq!(streaks.longest as i64, run.max(1));
    }

    #[test]
    fn nothing_is_due_before_creation(days in proptest::collection::vec(0u8..7, 1..7), back in 1i64..1000) {
        let created = date("2024-01-01");
        let schedule = Schedule::from_parts(ScheduleType::Recurring, Some(days), None).unwrap();
        let snapshot = ScheduleSnapshot::new(schedule, created);
        prop_assert!(!snapshot.is_active_on(created - Duration::days(back)));
    }
}
