/// Storage layer for persisting habit data
///
/// This module handles all database operations using SQLite. The three
/// traits mirror the three persistent concerns: live habit definitions,
/// completion facts, and the append-only version history.

pub mod completions;
pub mod migrations;
pub mod sqlite;
pub mod versions;

// Re-export the main storage types
pub use sqlite::*;

use chrono::NaiveDate;
use rusqlite::ErrorCode;
use thiserror::Error;

use crate::domain::{
    Completion, CompletionMap, Habit, HabitId, HabitVersion, OwnerId,
    RecurringDays, VersionSnapshot, WorkspaceId,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    /// Lost a race for a lock or a unique key; safe to retry
    #[error("Concurrent write conflict: {0}")]
    Conflict(String),

    /// Stored data breaks an invariant the engine relies on
    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    pub(crate) fn not_found(habit_id: &HabitId) -> Self {
        StorageError::HabitNotFound {
            habit_id: habit_id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            let unique_violation = failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                );
            let contended = matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked);

            if unique_violation || contended {
                return StorageError::Conflict(err.to_string());
            }
        }
        StorageError::Query(err)
    }
}

/// Outcome of a toggle: whether a completion now exists, and the record
/// that was created or removed
#[derive(Debug, Clone, PartialEq)]
pub struct Toggled {
    pub added: bool,
    pub completion: Completion,
}

/// Live habit definitions
///
/// Every lookup is scoped to an owner and workspace; a habit belonging to
/// someone else is reported exactly like a missing one.
pub trait HabitStorage {
    /// Insert a new habit together with its first, open version
    fn create_habit(&self, habit: &Habit) -> Result<HabitVersion, StorageError>;

    fn get_habit(&self, habit_id: &HabitId, owner: &OwnerId, workspace: &WorkspaceId) -> Result<Habit, StorageError>;

    /// Persist an edited habit
    ///
    /// When `version_change` is set the open version is closed at
    /// `edit_date` and a new one opened the next day, in the same
    /// transaction as the row update.
    fn update_habit(
        &self,
        previous: &Habit,
        updated: &Habit,
        edit_date: NaiveDate,
        version_change: bool,
    ) -> Result<(), StorageError>;

    /// Remove the live habit and its completions, archiving the completion
    /// dates and closing the open version at `deleted_on`
    ///
    /// Returns the number of archived completions.
    fn delete_habit(&self, habit: &Habit, deleted_on: NaiveDate) -> Result<usize, StorageError>;

    /// All habits of the caller, ordered by preferred time then newest first
    fn list_habits(&self, owner: &OwnerId, workspace: &WorkspaceId) -> Result<Vec<Habit>, StorageError>;

    /// Active habits created on or before `date` and scheduled on it
    fn list_habits_active_on(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        date: NaiveDate,
    ) -> Result<Vec<Habit>, StorageError>;

    /// Days in `[from, to]` whose weekday is in `days`, counted by the database
    fn count_scheduled_weekdays(&self, from: NaiveDate, to: NaiveDate, days: &RecurringDays) -> Result<u32, StorageError>;
}

/// Completion facts, one per (habit, day)
pub trait CompletionStore {
    /// Record a completion for its day, replacing any existing one
    fn complete(&self, completion: &Completion) -> Result<Completion, StorageError>;

    /// Flip whether a completion exists for `date`
    fn toggle(&self, habit: &Habit, date: NaiveDate) -> Result<Toggled, StorageError>;

    fn completions_in_range(
        &self,
        habit_id: &HabitId,
        owner: &OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Completion>, StorageError>;

    fn all_completions_for_workspace_in_range(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Completion>, StorageError>;

    /// Every completed day of a habit, ascending
    fn completion_dates(&self, habit_id: &HabitId) -> Result<Vec<NaiveDate>, StorageError>;

    fn count_completions(&self, habit_id: &HabitId) -> Result<u32, StorageError>;

    /// Completed (day, habit) pairs in range, including archived completions
    /// of deleted habits
    fn completion_map(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompletionMap, StorageError>;
}

/// Append-only history of habit definitions
pub trait VersionStore {
    /// Open the first version of a habit; fails if one is already open
    fn record_initial(&self, habit: &Habit, valid_from: NaiveDate) -> Result<HabitVersion, StorageError>;

    /// Close the open version at `edit_date` and open `snapshot` from the next day
    fn apply_edit(
        &self,
        previous: &Habit,
        snapshot: &VersionSnapshot,
        edit_date: NaiveDate,
    ) -> Result<HabitVersion, StorageError>;

    /// Close the open version at `date` without opening another
    fn close(&self, habit: &Habit, date: NaiveDate) -> Result<(), StorageError>;

    fn snapshot_for(
        &self,
        habit_id: &HabitId,
        workspace: &WorkspaceId,
        date: NaiveDate,
    ) -> Result<Option<HabitVersion>, StorageError>;

    fn open_version(&self, habit_id: &HabitId) -> Result<Option<HabitVersion>, StorageError>;

    /// Full history of a habit, oldest first
    fn versions_for(&self, habit_id: &HabitId) -> Result<Vec<HabitVersion>, StorageError>;

    /// Versions of the caller's habits whose interval meets `[start, end]`
    fn versions_in_range(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitVersion>, StorageError>;
}

/// Everything the engine needs from a backing store
pub trait Storage: HabitStorage + CompletionStore + VersionStore {}

impl<T: HabitStorage + CompletionStore + VersionStore> Storage for T {}
