/// Concurrent writers on separate connections to one database file
use std::path::Path;
use std::sync::Barrier;
use std::thread;

use habit_activity_engine::tools::{self, CompleteHabitParams, ToggleHabitParams};
use habit_activity_engine::{Caller, CompletionStore, Habit, SqliteStorage};
use tempfile::TempDir;

use crate::common::{create, date, new_caller};

const WRITERS: usize = 4;

fn shared_habit() -> (TempDir, Caller, Habit) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(dir.path().join("habits.db")).unwrap();
    let caller = new_caller();
    let habit = create(&storage, &caller, "Meditate", vec![0, 1, 2, 3, 4, 5, 6], "2024-01-01");
    (dir, caller, habit)
}

fn open(dir: &Path) -> SqliteStorage {
    SqliteStorage::new(dir.join("habits.db")).unwrap()
}

#[test]
fn test_parallel_completes_leave_one_record() {
    let (dir, caller, habit) = shared_habit();
    let barrier = Barrier::new(WRITERS);

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let barrier = &barrier;
            let dir = dir.path();
            let habit_id = habit.id.to_string();
            scope.spawn(move || {
                let storage = open(dir);
                let params = CompleteHabitParams {
                    habit_id,
                    date: Some("2024-01-05".to_string()),
                    notes: Some(format!("writer {}", writer)),
                    rating: None,
                    time: None,
                };
                barrier.wait();
                tools::with_conflict_retry(|| tools::complete_habit(&storage, &caller, params.clone(), date("2024-01-05")))
                    .unwrap();
            });
        }
    });

    let storage = open(dir.path());
    let stored = storage
        .completions_in_range(&habit.id, &caller.owner_id, date("2024-01-05"), date("2024-01-05"))
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_parallel_toggles_serialize() {
    let (dir, caller, habit) = shared_habit();
    let barrier = Barrier::new(2);

    let results: Vec<bool> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let barrier = &barrier;
                let dir = dir.path();
                let habit_id = habit.id.to_string();
                scope.spawn(move || {
                    let storage = open(dir);
                    let params = ToggleHabitParams {
                        habit_id,
                        date: Some("2024-01-05".to_string()),
                    };
                    barrier.wait();
                    tools::with_conflict_retry(|| tools::toggle_habit(&storage, &caller, params.clone(), date("2024-01-05")))
                        .unwrap()
                        .completed
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // One toggle created the record, the other removed it
    assert_eq!(results.iter().filter(|added| **added).count(), 1);
    let storage = open(dir.path());
    assert_eq!(storage.count_completions(&habit.id).unwrap(), 0);
}
