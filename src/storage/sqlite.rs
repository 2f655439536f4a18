/// SQLite implementation of the storage traits
///
/// This module owns the connection, the row mapping shared by the habit and
/// version tables, and the habit operations. Completion and version
/// operations live in their own modules on the same struct.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

use crate::domain::{
    Category, Habit, HabitId, HabitVersion, OwnerId, PreferredTime, RecurringDays, Schedule,
    ScheduleType, VersionSnapshot, WorkspaceId,
};
use crate::storage::{migrations, versions, HabitStorage, StorageError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const HABIT_COLUMNS: &str = "id, owner_id, workspace_id, title, description, color, icon, \
     target_days, daily_goal, preferred_time, category, schedule_type, recurring_days, one_time_date, \
     is_active, created_at, updated_at";

/// SQLite-based storage implementation
///
/// This struct holds a connection to the SQLite database and implements
/// the storage traits. Each write runs in an IMMEDIATE transaction so that
/// concurrent writers on other connections serialize on the database lock.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file and bring the schema up to date
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Private in-memory database, used by tests
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        configure_connection(&conn)
            .map_err(|e| StorageError::Connection(format!("Failed to configure connection: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction that takes the database lock up front
    pub(crate) fn write_transaction(&self) -> Result<Transaction<'_>, StorageError> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // In-memory databases answer "memory" here
    let _journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

/// Raw columns shared by `habits` and `habit_versions`
pub(crate) struct SnapshotRow {
    title: String,
    description: Option<String>,
    color: String,
    icon: Option<String>,
    target_days: i64,
    daily_goal: i64,
    preferred_time: Option<String>,
    category: Option<String>,
    schedule_type: String,
    recurring_days: Option<String>,
    one_time_date: Option<NaiveDate>,
    is_active: bool,
}

impl SnapshotRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            title: row.get("title")?,
            description: row.get("description")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            target_days: row.get("target_days")?,
            daily_goal: row.get("daily_goal")?,
            preferred_time: row.get("preferred_time")?,
            category: row.get("category")?,
            schedule_type: row.get("schedule_type")?,
            recurring_days: row.get("recurring_days")?,
            one_time_date: row.get("one_time_date")?,
            is_active: row.get("is_active")?,
        })
    }

    pub(crate) fn into_snapshot(self) -> Result<VersionSnapshot, StorageError> {
        let schedule_type = ScheduleType::parse(&self.schedule_type)
            .ok_or_else(|| StorageError::Integrity(format!("unknown schedule type '{}'", self.schedule_type)))?;
        let recurring_days: Option<Vec<u8>> = self
            .recurring_days
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let schedule = Schedule::from_parts(schedule_type, recurring_days, self.one_time_date)
            .map_err(|e| StorageError::Integrity(format!("stored schedule is invalid: {}", e)))?;

        let preferred_time = self
            .preferred_time
            .as_deref()
            .map(PreferredTime::from_storage)
            .transpose()
            .map_err(|e| StorageError::Integrity(e.to_string()))?;

        Ok(VersionSnapshot {
            title: self.title,
            description: self.description,
            color: self.color,
            icon: self.icon,
            target_days: stored_count(self.target_days, "target_days")?,
            daily_goal: stored_count(self.daily_goal, "daily_goal")?,
            preferred_time,
            category: self.category.as_deref().and_then(Category::parse),
            schedule,
            is_active: self.is_active,
        })
    }
}

fn stored_count(value: i64, column: &str) -> Result<u32, StorageError> {
    u32::try_from(value).map_err(|_| StorageError::Integrity(format!("{} out of range: {}", column, value)))
}

/// Column values for writing a snapshot
pub(crate) struct SnapshotParams {
    pub recurring_days: Option<String>,
    pub preferred_time: Option<String>,
    pub category: Option<String>,
}

impl SnapshotParams {
    pub(crate) fn of(snapshot: &VersionSnapshot) -> Result<Self, StorageError> {
        let recurring_days = snapshot
            .schedule
            .recurring_days()
            .map(|days| serde_json::to_string(days.as_slice()))
            .transpose()?;

        Ok(Self {
            recurring_days,
            preferred_time: snapshot.preferred_time.map(|t| t.to_storage()),
            category: snapshot.category.as_ref().map(|c| c.as_str().to_string()),
        })
    }
}

struct HabitRow {
    id: String,
    owner_id: String,
    workspace_id: String,
    snapshot: SnapshotRow,
    created_at: String,
    updated_at: String,
}

impl HabitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            workspace_id: row.get("workspace_id")?,
            snapshot: SnapshotRow::from_row(row)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_habit(self) -> Result<Habit, StorageError> {
        Ok(Habit::from_snapshot(
            parse_id(&self.id, HabitId::from_string)?,
            parse_id(&self.owner_id, OwnerId::from_string)?,
            parse_id(&self.workspace_id, WorkspaceId::from_string)?,
            self.snapshot.into_snapshot()?,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}

pub(crate) fn parse_id<T>(raw: &str, parse: fn(&str) -> Result<T, uuid::Error>) -> Result<T, StorageError> {
    parse(raw).map_err(|_| StorageError::Integrity(format!("invalid id in database: '{}'", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::Integrity(format!("invalid timestamp in database: '{}'", raw)))
}

fn query_habits(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Habit>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, HabitRow::from_row)?;

    let mut habits = Vec::new();
    for row in rows {
        habits.push(row?.into_habit()?);
    }
    Ok(habits)
}

/// Current row of a caller's habit, read on the given connection or transaction
pub(crate) fn habit_in(
    conn: &Connection,
    habit_id: &HabitId,
    owner: &OwnerId,
    workspace: &WorkspaceId,
) -> Result<Option<Habit>, StorageError> {
    let sql = format!(
        "SELECT {} FROM habits WHERE id = ?1 AND owner_id = ?2 AND workspace_id = ?3",
        HABIT_COLUMNS
    );
    Ok(query_habits(
        conn,
        &sql,
        params![habit_id.to_string(), owner.to_string(), workspace.to_string()],
    )?
    .into_iter()
    .next())
}

fn insert_habit_in(conn: &Connection, habit: &Habit) -> Result<(), StorageError> {
    let snapshot = VersionSnapshot::of(habit);
    let columns = SnapshotParams::of(&snapshot)?;

    conn.execute(
        "INSERT INTO habits (
            id, owner_id, workspace_id, title, description, color, icon,
            target_days, daily_goal, preferred_time, category,
            schedule_type, recurring_days, one_time_date, is_active,
            created_on, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            habit.id.to_string(),
            habit.owner_id.to_string(),
            habit.workspace_id.to_string(),
            habit.title,
            habit.description,
            habit.color,
            habit.icon,
            habit.target_days,
            habit.daily_goal,
            columns.preferred_time,
            columns.category,
            habit.schedule.schedule_type().as_str(),
            columns.recurring_days,
            habit.schedule.one_time_date(),
            habit.is_active,
            habit.created_on(),
            habit.created_at.to_rfc3339(),
            habit.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl HabitStorage for SqliteStorage {
    fn create_habit(&self, habit: &Habit) -> Result<HabitVersion, StorageError> {
        let tx = self.write_transaction()?;
        insert_habit_in(&tx, habit)?;
        let version = versions::record_initial_in(&tx, habit, habit.created_on())?;
        tx.commit()?;

        tracing::debug!("Created habit: {} ({})", habit.title, habit.id);
        Ok(version)
    }

    fn get_habit(&self, habit_id: &HabitId, owner: &OwnerId, workspace: &WorkspaceId) -> Result<Habit, StorageError> {
        habit_in(&self.conn, habit_id, owner, workspace)?.ok_or_else(|| StorageError::not_found(habit_id))
    }

    fn update_habit(
        &self,
        previous: &Habit,
        updated: &Habit,
        edit_date: NaiveDate,
        version_change: bool,
    ) -> Result<(), StorageError> {
        let snapshot = VersionSnapshot::of(updated);
        let columns = SnapshotParams::of(&snapshot)?;

        let tx = self.write_transaction()?;

        // The edit was merged onto `previous`; refuse it if another writer got there first
        let current = habit_in(&tx, &previous.id, &previous.owner_id, &previous.workspace_id)?
            .ok_or_else(|| StorageError::not_found(&previous.id))?;
        if current != *previous {
            return Err(StorageError::Conflict(format!(
                "habit {} changed since it was read",
                previous.id
            )));
        }

        let rows_affected = tx.execute(
            "UPDATE habits SET
                title = ?4, description = ?5, color = ?6, icon = ?7,
                target_days = ?8, daily_goal = ?9, preferred_time = ?10, category = ?11,
                schedule_type = ?12, recurring_days = ?13, one_time_date = ?14, is_active = ?15,
                updated_at = ?16
             WHERE id = ?1 AND owner_id = ?2 AND workspace_id = ?3",
            params![
                updated.id.to_string(),
                updated.owner_id.to_string(),
                updated.workspace_id.to_string(),
                updated.title,
                updated.description,
                updated.color,
                updated.icon,
                updated.target_days,
                updated.daily_goal,
                columns.preferred_time,
                columns.category,
                updated.schedule.schedule_type().as_str(),
                columns.recurring_days,
                updated.schedule.one_time_date(),
                updated.is_active,
                updated.updated_at.to_rfc3339(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::not_found(&updated.id));
        }

        if version_change {
            versions::apply_edit_in(&tx, previous, &snapshot, edit_date)?;
        }
        tx.commit()?;

        tracing::debug!("Updated habit: {} (new version: {})", updated.id, version_change);
        Ok(())
    }

    fn delete_habit(&self, habit: &Habit, deleted_on: NaiveDate) -> Result<usize, StorageError> {
        let habit_id = habit.id.to_string();
        let tx = self.write_transaction()?;

        let archived = tx.execute(
            "INSERT OR IGNORE INTO habit_completion_history (habit_id, owner_id, workspace_id, date, deleted_on)
             SELECT habit_id, owner_id, workspace_id, date, ?2
             FROM habit_completions WHERE habit_id = ?1",
            params![habit_id, deleted_on],
        )?;
        tx.execute("DELETE FROM habit_completions WHERE habit_id = ?1", params![habit_id])?;

        versions::close_in(&tx, habit, deleted_on)?;

        let rows_affected = tx.execute(
            "DELETE FROM habits WHERE id = ?1 AND owner_id = ?2 AND workspace_id = ?3",
            params![habit_id, habit.owner_id.to_string(), habit.workspace_id.to_string()],
        )?;
        if rows_affected == 0 {
            return Err(StorageError::not_found(&habit.id));
        }
        tx.commit()?;

        tracing::debug!("Deleted habit: {} ({} completions archived)", habit.id, archived);
        Ok(archived)
    }

    fn list_habits(&self, owner: &OwnerId, workspace: &WorkspaceId) -> Result<Vec<Habit>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habits
             WHERE owner_id = ?1 AND workspace_id = ?2
             ORDER BY preferred_time NULLS LAST, created_at DESC",
            HABIT_COLUMNS
        );
        query_habits(&self.conn, &sql, params![owner.to_string(), workspace.to_string()])
    }

    fn list_habits_active_on(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        date: NaiveDate,
    ) -> Result<Vec<Habit>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habits
             WHERE owner_id = ?1
               AND workspace_id = ?2
               AND is_active = 1
               AND created_on <= ?3
               AND (
                   (schedule_type = 'recurring' AND EXISTS (
                       SELECT 1 FROM json_each(habits.recurring_days)
                       WHERE json_each.value = CAST(strftime('%w', ?3) AS INTEGER)
                   ))
                   OR (schedule_type = 'one_time' AND one_time_date = ?3)
               )
             ORDER BY preferred_time NULLS LAST, created_at DESC",
            HABIT_COLUMNS
        );
        query_habits(
            &self.conn,
            &sql,
            params![owner.to_string(), workspace.to_string(), date],
        )
    }

    fn count_scheduled_weekdays(&self, from: NaiveDate, to: NaiveDate, days: &RecurringDays) -> Result<u32, StorageError> {
        if from > to {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            "WITH RECURSIVE span(day) AS (
                 SELECT date(?1)
                 UNION ALL
                 SELECT date(day, '+1 day') FROM span WHERE day < date(?2)
             )
             SELECT COUNT(*) FROM span WHERE instr(?3, strftime('%w', day)) > 0",
            params![from, to, days.digits()],
            |row| row.get(0),
        )?;

        u32::try_from(count).map_err(|_| StorageError::Integrity(format!("scheduled day count overflow: {}", count)))
    }
}
