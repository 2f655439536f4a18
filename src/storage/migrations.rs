/// Database migration management
///
/// This module handles creating and updating the SQLite database schema.
/// It ensures the database has all the required tables and indexes.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// This creates all required tables and indexes if they don't exist.
/// It also sets up the version tracking for future migrations. The check
/// and the migration share one IMMEDIATE transaction, so processes opening
/// a fresh file together migrate it once.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(migration_error)?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )
    .map_err(migration_error)?;

    let current_version = get_current_version(&tx)?;

    if current_version < CURRENT_VERSION {
        run_migrations(&tx, current_version)?;
        set_version(&tx, CURRENT_VERSION)?;
    }

    tx.commit().map_err(migration_error)
}

fn migration_error(err: rusqlite::Error) -> StorageError {
    StorageError::Migration(err.to_string())
}

/// Get the current database schema version (0 for a fresh database)
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()
        .map_err(migration_error)?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", []).map_err(migration_error)?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(migration_error)?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: habits, versions, completions and the archive
///
/// Dates are stored as `YYYY-MM-DD` text so that comparisons and
/// `strftime('%w', ...)` work on whole days.
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            color TEXT NOT NULL,
            icon TEXT,
            target_days INTEGER NOT NULL,
            daily_goal INTEGER NOT NULL DEFAULT 1,
            preferred_time TEXT,
            category TEXT,
            schedule_type TEXT NOT NULL CHECK (schedule_type IN ('recurring', 'one_time')),
            recurring_days TEXT,
            one_time_date DATE,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_on DATE NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (
                (schedule_type = 'recurring' AND recurring_days IS NOT NULL AND one_time_date IS NULL)
                OR (schedule_type = 'one_time' AND one_time_date IS NOT NULL AND recurring_days IS NULL)
            )
        );

        -- No foreign key to habits: versions outlive the habit they describe
        CREATE TABLE IF NOT EXISTS habit_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            color TEXT NOT NULL,
            icon TEXT,
            target_days INTEGER NOT NULL,
            daily_goal INTEGER NOT NULL,
            preferred_time TEXT,
            category TEXT,
            schedule_type TEXT NOT NULL CHECK (schedule_type IN ('recurring', 'one_time')),
            recurring_days TEXT,
            one_time_date DATE,
            is_active BOOLEAN NOT NULL,
            valid_from DATE NOT NULL,
            valid_to DATE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            id TEXT PRIMARY KEY,
            habit_id TEXT NOT NULL REFERENCES habits (id) ON DELETE CASCADE,
            owner_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            date DATE NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
            time TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (habit_id, date)
        );

        -- Completion days of deleted habits, kept for the calendar
        CREATE TABLE IF NOT EXISTS habit_completion_history (
            habit_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            date DATE NOT NULL,
            deleted_on DATE NOT NULL,
            PRIMARY KEY (habit_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_habits_owner_workspace
            ON habits (owner_id, workspace_id, is_active);

        -- At most one open version per habit
        CREATE UNIQUE INDEX IF NOT EXISTS idx_habit_versions_open
            ON habit_versions (habit_id) WHERE valid_to IS NULL;

        CREATE INDEX IF NOT EXISTS idx_habit_versions_lookup
            ON habit_versions (habit_id, workspace_id, valid_from);

        CREATE INDEX IF NOT EXISTS idx_habit_versions_workspace
            ON habit_versions (owner_id, workspace_id, valid_from);

        CREATE INDEX IF NOT EXISTS idx_habit_completions_workspace_date
            ON habit_completions (owner_id, workspace_id, date);

        CREATE INDEX IF NOT EXISTS idx_habit_completion_history_workspace_date
            ON habit_completion_history (owner_id, workspace_id, date);",
    )
    .map_err(migration_error)?;

    tracing::info!("Applied migration v1: Created habit engine schema");
    Ok(())
}
