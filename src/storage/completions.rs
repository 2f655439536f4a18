/// Completion persistence
///
/// One row per (habit, date), guarded by a unique index. Writes run in
/// IMMEDIATE transactions so a toggle's read and write see the same state.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{
    Completion, CompletionId, CompletionMap, Habit, HabitId, OwnerId, Rating, WorkspaceId,
};
use crate::storage::sqlite::{habit_in, parse_id, parse_timestamp};
use crate::storage::{CompletionStore, SqliteStorage, StorageError, Toggled};

const COMPLETION_COLUMNS: &str = "id, habit_id, owner_id, workspace_id, date, notes, rating, time, created_at";

struct CompletionRow {
    id: String,
    habit_id: String,
    owner_id: String,
    workspace_id: String,
    date: NaiveDate,
    notes: String,
    rating: Option<i64>,
    time: Option<String>,
    created_at: String,
}

impl CompletionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            habit_id: row.get("habit_id")?,
            owner_id: row.get("owner_id")?,
            workspace_id: row.get("workspace_id")?,
            date: row.get("date")?,
            notes: row.get("notes")?,
            rating: row.get("rating")?,
            time: row.get("time")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_completion(self) -> Result<Completion, StorageError> {
        let rating = match self.rating {
            // The column check keeps 0 out; treat it as corruption if it appears
            Some(value) => Some(
                Rating::from_input(Some(value))
                    .ok()
                    .flatten()
                    .ok_or_else(|| StorageError::Integrity(format!("stored rating out of range: {}", value)))?,
            ),
            None => None,
        };

        Ok(Completion {
            id: parse_id(&self.id, CompletionId::from_string)?,
            habit_id: parse_id(&self.habit_id, HabitId::from_string)?,
            owner_id: parse_id(&self.owner_id, OwnerId::from_string)?,
            workspace_id: parse_id(&self.workspace_id, WorkspaceId::from_string)?,
            date: self.date,
            notes: self.notes,
            rating,
            time: self.time,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn query_completions(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Completion>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, CompletionRow::from_row)?;

    let mut completions = Vec::new();
    for row in rows {
        completions.push(row?.into_completion()?);
    }
    Ok(completions)
}

fn insert_completion_in(conn: &Connection, completion: &Completion) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO habit_completions (
            id, habit_id, owner_id, workspace_id, date, notes, rating, time, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            completion.id.to_string(),
            completion.habit_id.to_string(),
            completion.owner_id.to_string(),
            completion.workspace_id.to_string(),
            completion.date,
            completion.notes,
            completion.rating.map(|r| r.value()),
            completion.time,
            completion.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn find_completion_in(conn: &Connection, habit_id: &HabitId, date: NaiveDate) -> Result<Option<Completion>, StorageError> {
    let sql = format!(
        "SELECT {} FROM habit_completions WHERE habit_id = ?1 AND date = ?2",
        COMPLETION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![habit_id.to_string(), date], CompletionRow::from_row)
        .optional()?;
    row.map(CompletionRow::into_completion).transpose()
}

impl CompletionStore for SqliteStorage {
    fn complete(&self, completion: &Completion) -> Result<Completion, StorageError> {
        let tx = self.write_transaction()?;
        if habit_in(&tx, &completion.habit_id, &completion.owner_id, &completion.workspace_id)?.is_none() {
            return Err(StorageError::not_found(&completion.habit_id));
        }
        let replaced = find_completion_in(&tx, &completion.habit_id, completion.date)?;
        if let Some(old) = &replaced {
            tx.execute("DELETE FROM habit_completions WHERE id = ?1", params![old.id.to_string()])?;
        }
        insert_completion_in(&tx, completion)?;
        tx.commit()?;

        tracing::debug!(
            "Completed habit {} on {}{}",
            completion.habit_id,
            completion.date,
            if replaced.is_some() { " (replaced existing)" } else { "" }
        );
        Ok(completion.clone())
    }

    fn toggle(&self, habit: &Habit, date: NaiveDate) -> Result<Toggled, StorageError> {
        let tx = self.write_transaction()?;
        // The habit may have been deleted since the caller loaded it
        if habit_in(&tx, &habit.id, &habit.owner_id, &habit.workspace_id)?.is_none() {
            return Err(StorageError::not_found(&habit.id));
        }

        let toggled = match find_completion_in(&tx, &habit.id, date)? {
            Some(existing) => {
                tx.execute("DELETE FROM habit_completions WHERE id = ?1", params![existing.id.to_string()])?;
                Toggled {
                    added: false,
                    completion: existing,
                }
            }
            None => {
                let completion = Completion::bare(habit.id, habit.owner_id, habit.workspace_id, date, chrono::Utc::now());
                insert_completion_in(&tx, &completion)?;
                Toggled {
                    added: true,
                    completion,
                }
            }
        };
        tx.commit()?;

        tracing::debug!("Toggled habit {} on {}: completed = {}", habit.id, date, toggled.added);
        Ok(toggled)
    }

    fn completions_in_range(
        &self,
        habit_id: &HabitId,
        owner: &OwnerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Completion>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_completions
             WHERE habit_id = ?1 AND owner_id = ?2 AND date BETWEEN ?3 AND ?4
             ORDER BY date DESC, time DESC",
            COMPLETION_COLUMNS
        );
        query_completions(
            self.conn(),
            &sql,
            params![habit_id.to_string(), owner.to_string(), start, end],
        )
    }

    fn all_completions_for_workspace_in_range(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Completion>, StorageError> {
        let sql = format!(
            "SELECT {} FROM habit_completions
             WHERE owner_id = ?1 AND workspace_id = ?2 AND date BETWEEN ?3 AND ?4
             ORDER BY date DESC, time DESC",
            COMPLETION_COLUMNS
        );
        query_completions(
            self.conn(),
            &sql,
            params![owner.to_string(), workspace.to_string(), start, end],
        )
    }

    fn completion_dates(&self, habit_id: &HabitId) -> Result<Vec<NaiveDate>, StorageError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT date FROM habit_completions WHERE habit_id = ?1 ORDER BY date")?;
        let dates = stmt
            .query_map(params![habit_id.to_string()], |row| row.get(0))?
            .collect::<Result<Vec<NaiveDate>, _>>()?;
        Ok(dates)
    }

    fn count_completions(&self, habit_id: &HabitId) -> Result<u32, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM habit_completions WHERE habit_id = ?1",
            params![habit_id.to_string()],
            |row| row.get(0),
        )?;
        u32::try_from(count).map_err(|_| StorageError::Integrity(format!("completion count overflow: {}", count)))
    }

    fn completion_map(
        &self,
        owner: &OwnerId,
        workspace: &WorkspaceId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompletionMap, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT habit_id, date FROM habit_completions
             WHERE owner_id = ?1 AND workspace_id = ?2 AND date BETWEEN ?3 AND ?4
             UNION
             SELECT habit_id, date FROM habit_completion_history
             WHERE owner_id = ?1 AND workspace_id = ?2 AND date BETWEEN ?3 AND ?4",
        )?;
        let rows = stmt.query_map(
            params![owner.to_string(), workspace.to_string(), start, end],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, NaiveDate>(1)?)),
        )?;

        let mut map = CompletionMap::new();
        for row in rows {
            let (habit_id, date) = row?;
            map.insert(date, parse_id(&habit_id, HabitId::from_string)?);
        }
        Ok(map)
    }
}
