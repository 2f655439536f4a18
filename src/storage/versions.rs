/// Version history persistence
///
/// `habit_versions` is append-only: rows are inserted and their `valid_to`
/// set once, never deleted. The `*_in` functions take any connection so the
/// habit operations can run them inside their own transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{
    select_version, Habit, HabitId, HabitVersion, OwnerId, VersionSnapshot, WorkspaceId,
};
use crate::storage::sqlite::{parse_id, SnapshotParams, SnapshotRow};
use crate::storage::{SqliteStorage, StorageError, VersionStore};

const VERSION_COLUMNS: &str = "id, habit_id, owner_id, workspace_id, title, description, color, icon, \
     target_days, daily_goal, preferred_time, category, schedule_type, recurring_days, one_time_date, \
     is_active, valid_from, valid_to";

struct VersionRow {
    id: i64,
    habit_id: String,
    owner_id: String,
    workspace_id: String,
    snapshot: SnapshotRow,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            habit_id: row.get("habit_id")?,
            owner_id: row.get("owner_id")?,
            workspace_id: row.get("workspace_id")?,
            snapshot: SnapshotRow::from_row(row)?,
            valid_from: row.get("valid_from")?,
            valid_to: row.get("valid_to")?,
        })
    }

    fn into_version(self) -> Result<HabitVersion, StorageError> {
        Ok(HabitVersion {
            id: self.id,
            habit_id: parse_id(&self.habit_id, HabitId::from_string)?,
            owner_id: parse_id(&self.owner_id, OwnerId::from_string)?,
            workspace_id: parse_id(&self.workspace_id, WorkspaceId::from_string)?,
            snapshot: self.snapshot.into_snapshot()?,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
        })
    }
}

fn query_versions(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<HabitVersion>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, VersionRow::from_row)?;

    let mut versions = Vec::new();
    for row in rows {
        versions.push(row?.into_version()?);
    }
    Ok(versions)
}

fn insert_version_in(
    conn: &Connection,
    habit: &Habit,
    snapshot: &VersionSnapshot,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
) -> Result<HabitVersion, StorageError> {
    let columns = SnapshotParams::of(snapshot)?;

    conn.execute(
        "INSERT INTO habit_versions (
            habit_id, owner_id, workspace_id, title, description, color, icon,
            target_days, daily_goal, preferred_time, category,
            schedule_type, recurring_days, one_time_date, is_active,
            valid_from, valid_to, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            habit.id.to_string(),
            habit.owner_id.to_string(),
            habit.workspace_id.to_string(),
            snapshot.title,
            snapshot.description,
            snapshot.color,
            snapshot.icon,
            snapshot.target_days,
            snapshot.daily_goal,
            columns.preferred_time,
            columns.category,
            snapshot.schedule.schedule_type().as_str(),
            columns.recurring_days,
            snapshot.schedule.one_time_date(),
            snapshot.is_active,
            valid_from,
            valid_to,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(HabitVersion {
        id: conn.last_insert_rowid(),
        habit_id: habit.id,
        owner_id: habit.owner_id,
        workspace_id: habit.workspace_id,
        snapshot: snapshot.clone(),
        valid_from,
        valid_to,
    })
}

pub(crate) fn open_version_in(conn: &Connection, habit_id: &HabitId) -> Result<Option<HabitVersion>, StorageError> {
    let sql = format!(
        "SELECT {} FROM habit_versions WHERE habit_id = ?1 AND valid_to IS NULL",
        VERSION_COLUMNS
    );
    Ok(query_versions(conn, &sql, params![habit_id.to_string()])?.into_iter().next())
}

pub(crate) fn record_initial_in(conn: &Connection, habit: &Habit, valid_from: NaiveDate) -> Result<HabitVersion, StorageError> {
    if let Some(open) = open_version_in(conn, &habit.id)? {
        tracing::error!(
            "Habit {} already has an open version (id {}, from {})",
            habit.id,
            open.id,
            open.valid_from
        );
        return Err(StorageError::Integrity(format!(
            "habit {} already has an open version",
            habit.id
        )));
    }

    let version = insert_version_in(conn, habit, &VersionSnapshot::of(habit), valid_from, None)?;
    tracing::debug!("Opened initial version {} for habit {} from {}", version.id, habit.id, valid_from);
    Ok(version)
}

/// Close the open version at `date`
///
/// When no version is open the history has a gap. It is repaired by
/// inserting a closed version built from `previous` (the last known live
/// state) that runs from the day after the last closed version, or from
/// creation, through `date`.
pub(crate) fn close_in(conn: &Connection, previous: &Habit, date: NaiveDate) -> Result<(), StorageError> {
    let closed = conn.execute(
        "UPDATE habit_versions SET valid_to = ?2 WHERE habit_id = ?1 AND valid_to IS NULL",
        params![previous.id.to_string(), date],
    )?;

    match closed {
        1 => {
            tracing::debug!("Closed open version of habit {} at {}", previous.id, date);
            Ok(())
        }
        0 => repair_gap_in(conn, previous, date),
        n => {
            tracing::error!("Habit {} had {} open versions", previous.id, n);
            Err(StorageError::Integrity(format!(
                "habit {} had {} open versions",
                previous.id, n
            )))
        }
    }
}

fn repair_gap_in(conn: &Connection, previous: &Habit, date: NaiveDate) -> Result<(), StorageError> {
    let last_closed: Option<NaiveDate> = conn
        .query_row(
            "SELECT MAX(valid_to) FROM habit_versions WHERE habit_id = ?1",
            params![previous.id.to_string()],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    let from = match last_closed {
        Some(last) => last
            .succ_opt()
            .ok_or_else(|| StorageError::Integrity(format!("version of habit {} closes at the end of time", previous.id)))?,
        None => previous.created_on(),
    };

    tracing::warn!(
        "No open version for habit {}; reconstructing [{}, {}] from the live definition",
        previous.id,
        from,
        date
    );

    if from <= date {
        insert_version_in(conn, previous, &VersionSnapshot::of(previous), from, Some(date))?;
    }
    Ok(())
}

/// Close the open version at `edit_date` and open `snapshot` from the next day
pub(crate) fn apply_edit_in(
    conn: &Connection,
    previous: &Habit,
    snapshot: &VersionSnapshot,
    edit_date: NaiveDate,
) -> Result<HabitVersion, StorageError> {
    let effective = edit_date
        .succ_opt()
        .ok_or_else(|| StorageError::Integrity(format!("cannot open a version after {}", edit_date)))?;

    close_in(conn, previous, edit_date)?;
    let version = insert_version_in(conn, previous, snapshot, effective, None)?;

    tracing::debug!("Opened version {} for habit {} from {}", version.id, previous.id, effective);
    Ok(version)
}

impl VersionStore for SqliteStorage {
    fn record_initial(&self, habit: &Habit, valid_from: NaiveDate) -> Result<HabitVersion, StorageError> {
        let tx = self.write_transaction()?;
        let version = record_initial_in(&tx, habit, valid_from)?;
        tx.commit()?;
        Ok(version)
    }

    fn apply_edit(
        &self,
        previous: &Habit,
        snapshot: &VersionSnapshot,
        edit_date: NaiveDate,
    ) -> Result<HabitVersion, StorageError> {
        let tx = self.write_transaction()?;
        let version = apply_edit_in(&tx, previous, snapshot, edit_date)?;
        tx.commit()?;
        Ok(version)
    }

    fn close(&self, habit: &Habit, date: NaiveDate) -> Result<(), StorageError> {
        let tx = self.write_transaction()?;
        close_in(&tx, habit, date)?;
        tx.commit()?;
        Ok(())
    }

    fn snapshot_for(
        &self,
        habit_id: &HabitId,
        workspace: &WorkspaceId,
        date: NaiveDate,
    ) -> Result<Option<HabitVersion>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_versions
             WHERE habit_id = ?1 AND workspace_id = ?2
               AND valid_from <= ?3 AND (valid_to IS NULL OR valid_to >= ?3)",
            VERSION_COLUMNS
        );
        let candidates = query_versions(
            self.conn(),
            &sql,
            params![habit_id.to_string(), workspace.to_string(), date],
        )?;
        Ok(select_version(&candidates, date).cloned())
    }

    fn open_version(&self, habit_id: &HabitId) -> Result<Option<HabitVersion>, StorageError> {
        open_version_in(self.conn(), habit_id)
    }

    fn versions_for(&self, habit_id: &HabitId) -> Result<Vec<HabitVersion>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_versions WHERE habit_id = ?1 ORDER BY valid_from, id",
            VERSION_COLUMNS
        );
        query_versions(self.conn(), &sql, params![habit_id.to_string()])
    }

    fn versions_in_range(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitVersion>, StorageError> {
        // Open versions are always included: their valid_from is the habit's
        // effective date even when it lies past the range
        let sql = format!(
            "SELECT {} FROM habit_versions
             WHERE owner_id = ?1 AND workspace_id = ?2
               AND (valid_to IS NULL OR (valid_from <= ?4 AND valid_to >= ?3))
             ORDER BY habit_id, valid_from, id",
            VERSION_COLUMNS
        );
        query_versions(
            self.conn(),
            &sql,
            params![owner.to_string(), workspace.to_string(), start, end],
        )
    }
}
