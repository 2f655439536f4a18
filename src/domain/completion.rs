/// Completion records
///
/// A completion marks one (habit, calendar day) pair as performed, with an
/// optional note, rating and time of day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::parse_clock_time;
use crate::domain::{CompletionId, DomainError, HabitId, OwnerId, WorkspaceId};

const MAX_NOTES_LEN: usize = 500;
const MAX_TIME_LEN: usize = 32;

/// Subjective rating from 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    /// Interpret caller input: absent or 0 means unrated, 1-5 is a rating
    pub fn from_input(value: Option<i64>) -> Result<Option<Self>, DomainError> {
        match value {
            None | Some(0) => Ok(None),
            Some(v @ 1..=5) => Ok(Some(Rating(v as u8))),
            Some(v) => Err(DomainError::invalid_value(format!(
                "rating must be between 1 and 5, got {}",
                v
            ))),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// A record of performing a habit on a calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub id: CompletionId,
    pub habit_id: HabitId,
    #[serde(rename = "userId")]
    pub owner_id: OwnerId,
    pub workspace_id: WorkspaceId,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller input for recording a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionInput {
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub time: Option<String>,
}

impl Completion {
    /// Build a validated completion for `date`
    pub fn new(
        habit_id: HabitId,
        owner_id: OwnerId,
        workspace_id: WorkspaceId,
        date: NaiveDate,
        input: CompletionInput,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let notes = input.notes.map(|n| n.trim().to_string()).unwrap_or_default();
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(DomainError::validation(format!(
                "Notes cannot be longer than {} characters",
                MAX_NOTES_LEN
            )));
        }

        Ok(Self {
            id: CompletionId::new(),
            habit_id,
            owner_id,
            workspace_id,
            date,
            notes,
            rating: Rating::from_input(input.rating)?,
            time: normalize_time(input.time)?,
            created_at,
        })
    }

    /// Plain completion with no note, rating or time (what a toggle creates)
    pub fn bare(
        habit_id: HabitId,
        owner_id: OwnerId,
        workspace_id: WorkspaceId,
        date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CompletionId::new(),
            habit_id,
            owner_id,
            workspace_id,
            date,
            notes: String::new(),
            rating: None,
            time: None,
            created_at,
        }
    }
}

/// Time of day is free text; clock times are normalized to `HH:MM:SS`
fn normalize_time(time: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(raw) = time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if let Some(clock) = parse_clock_time(&raw) {
        return Ok(Some(clock.format("%H:%M:%S").to_string()));
    }
    if raw.chars().count() > MAX_TIME_LEN {
        return Err(DomainError::validation(format!(
            "time cannot be longer than {} characters",
            MAX_TIME_LEN
        )));
    }
    Ok(Some(raw))
}

/// Which habits were completed on which day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionMap {
    days: BTreeMap<NaiveDate, BTreeSet<HabitId>>,
}

impl CompletionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, habit_id: HabitId) {
        self.days.entry(date).or_default().insert(habit_id);
    }

    pub fn contains(&self, date: NaiveDate, habit_id: &HabitId) -> bool {
        self.days.get(&date).is_some_and(|habits| habits.contains(habit_id))
    }

    /// Habits completed on `date`, in id order
    pub fn habits_on(&self, date: NaiveDate) -> impl Iterator<Item = &HabitId> + '_ {
        self.days.get(&date).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl FromIterator<(NaiveDate, HabitId)> for CompletionMap {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, HabitId)>>(iter: I) -> Self {
        let mut map = CompletionMap::new();
        for (date, habit_id) in iter {
            map.insert(date, habit_id);
        }
        map
    }
}
