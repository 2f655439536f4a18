/// Habit entity and related functionality
///
/// This module defines the Habit struct that represents one scheduled
/// activity owned by a user within a workspace, the draft used to create it
/// and the partial update applied to it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Category, DomainError, HabitId, OwnerId, PreferredTime, Schedule, ScheduleSnapshot,
    ScheduleType, VersionSnapshot, WorkspaceId,
};

/// Color given to habits created without one
pub const DEFAULT_COLOR: &str = "#3B82F6";

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_ICON_LEN: usize = 50;

/// A habit the user wants to perform on scheduled days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    #[serde(rename = "userId")]
    pub owner_id: OwnerId,
    pub workspace_id: WorkspaceId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Target count of days (defaults to the number of scheduled weekdays)
    pub target_days: u32,
    /// How many times per day the habit should be done
    pub daily_goal: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<PreferredTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(flatten)]
    pub schedule: Schedule,
    /// Whether this habit is currently active (can be paused)
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller input for creating a habit, before defaults are applied
#[derive(Debug, Clone, Default)]
pub struct HabitDraft {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub target_days: Option<u32>,
    pub daily_goal: Option<u32>,
    pub preferred_time: Option<String>,
    pub category: Option<String>,
    pub schedule_type: Option<ScheduleType>,
    pub recurring_days: Option<Vec<u8>>,
    pub one_time_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Partial update; `None` leaves a field untouched
///
/// For the optional text fields an empty string clears the value.
#[derive(Debug, Clone, Default)]
pub struct HabitUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub target_days: Option<i64>,
    pub daily_goal: Option<i64>,
    pub preferred_time: Option<String>,
    pub category: Option<String>,
    pub schedule_type: Option<ScheduleType>,
    pub recurring_days: Option<Vec<u8>>,
    pub one_time_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

impl HabitUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.target_days.is_none()
            && self.daily_goal.is_none()
            && self.preferred_time.is_none()
            && self.category.is_none()
            && self.schedule_type.is_none()
            && self.recurring_days.is_none()
            && self.one_time_date.is_none()
            && self.is_active.is_none()
    }

    fn touches_schedule(&self) -> bool {
        self.schedule_type.is_some() || self.recurring_days.is_some() || self.one_time_date.is_some()
    }
}

impl Habit {
    /// Create a new habit with validation and defaults
    pub fn new(
        owner_id: OwnerId,
        workspace_id: WorkspaceId,
        draft: HabitDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let title = validate_title(&draft.title)?;
        let description = validate_description(draft.description)?;
        let color = match non_empty(draft.color) {
            Some(color) => validate_color(&color)?,
            None => DEFAULT_COLOR.to_string(),
        };
        let icon = validate_icon(draft.icon)?;

        let schedule = Schedule::from_parts(
            draft.schedule_type.unwrap_or(ScheduleType::Recurring),
            draft.recurring_days,
            draft.one_time_date,
        )?;

        let preferred_time = match draft.preferred_time {
            Some(raw) => PreferredTime::parse(&raw)?,
            None => None,
        };
        let category = draft.category.as_deref().and_then(Category::parse);

        let target_days = draft
            .target_days
            .filter(|days| *days > 0)
            .unwrap_or_else(|| schedule.default_target_days());
        let daily_goal = draft.daily_goal.filter(|goal| *goal > 0).unwrap_or(1);

        Ok(Self {
            id: HabitId::new(),
            owner_id,
            workspace_id,
            title,
            description,
            color,
            icon,
            target_days,
            daily_goal,
            preferred_time,
            category,
            schedule,
            is_active: draft.is_active.unwrap_or(true),
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuild a habit from stored columns (used by the storage layer)
    pub fn from_snapshot(
        id: HabitId,
        owner_id: OwnerId,
        workspace_id: WorkspaceId,
        snapshot: VersionSnapshot,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            workspace_id,
            title: snapshot.title,
            description: snapshot.description,
            color: snapshot.color,
            icon: snapshot.icon,
            target_days: snapshot.target_days,
            daily_goal: snapshot.daily_goal,
            preferred_time: snapshot.preferred_time,
            category: snapshot.category,
            schedule: snapshot.schedule,
            is_active: snapshot.is_active,
            created_at,
            updated_at,
        }
    }

    /// Apply a partial update
    ///
    /// Returns true when a field shown on the calendar or used for scheduling
    /// (title, color, schedule, active flag) actually changed, which is what
    /// requires a new version.
    pub fn apply_update(&mut self, update: HabitUpdate, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let before = self.clone();

        // Validate everything up front so a failed update leaves the habit untouched
        let schedule = if update.touches_schedule() {
            Some(self.merge_schedule(&update)?)
        } else {
            None
        };
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let description = update
            .description
            .map(|d| validate_description(Some(d)))
            .transpose()?;
        let color = update.color.as_deref().map(validate_color).transpose()?;
        let icon = update.icon.map(|i| validate_icon(Some(i))).transpose()?;
        let preferred_time = update
            .preferred_time
            .as_deref()
            .map(PreferredTime::parse)
            .transpose()?;

        let target_days = positive_count(update.target_days, "targetDays")?;
        let daily_goal = positive_count(update.daily_goal, "dailyGoal")?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(color) = color {
            self.color = color;
        }
        if let Some(icon) = icon {
            self.icon = icon;
        }
        if let Some(preferred_time) = preferred_time {
            self.preferred_time = preferred_time;
        }
        if let Some(category) = update.category {
            self.category = Category::parse(&category);
        }
        if let Some(schedule) = schedule {
            if update.recurring_days.is_some() || schedule.schedule_type() != self.schedule.schedule_type() {
                self.target_days = schedule.default_target_days();
            }
            self.schedule = schedule;
        }
        if let Some(days) = target_days {
            self.target_days = days;
        }
        if let Some(goal) = daily_goal {
            self.daily_goal = goal;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;

        Ok(self.title != before.title
            || self.color != before.color
            || self.schedule != before.schedule
            || self.is_active != before.is_active)
    }

    /// Combine the requested schedule fields with the current ones
    ///
    /// Fields of the current shape survive only while the type is unchanged;
    /// switching type clears the other shape.
    fn merge_schedule(&self, update: &HabitUpdate) -> Result<Schedule, DomainError> {
        let new_type = update.schedule_type.unwrap_or_else(|| self.schedule.schedule_type());
        let same_type = new_type == self.schedule.schedule_type();

        let recurring_days = update.recurring_days.clone().or_else(|| {
            same_type
                .then(|| self.schedule.recurring_days().map(|d| d.as_slice().to_vec()))
                .flatten()
        });
        let one_time_date = update
            .one_time_date
            .or_else(|| same_type.then(|| self.schedule.one_time_date()).flatten());

        match new_type {
            ScheduleType::Recurring => Schedule::from_parts(new_type, recurring_days, None)
                .and_then(|s| reject_foreign(s, update.one_time_date.is_some())),
            ScheduleType::OneTime => Schedule::from_parts(new_type, None, one_time_date).and_then(|s| {
                reject_foreign(s, update.recurring_days.as_ref().is_some_and(|d| !d.is_empty()))
            }),
        }
    }

    /// The calendar day the habit was created on, its first possible active day
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Schedule of the live definition, valid from creation
    pub fn schedule_snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot::new(self.schedule.clone(), self.created_on())
    }

    /// Whether the live definition makes this habit due on `date`
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.schedule_snapshot().is_active_on(date)
    }
}

fn reject_foreign(schedule: Schedule, foreign_field_given: bool) -> Result<Schedule, DomainError> {
    if foreign_field_given {
        return Err(DomainError::InvalidSchedule(
            "recurringDays and oneTimeDate are mutually exclusive".to_string(),
        ));
    }
    Ok(schedule)
}

/// Non-positive counts are ignored rather than rejected
fn positive_count(value: Option<i64>, field: &str) -> Result<Option<u32>, DomainError> {
    match value.filter(|v| *v > 0) {
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| DomainError::invalid_value(format!("{} is too large", field))),
        None => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(DomainError::InvalidTitle("Habit title cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::InvalidTitle(format!(
            "Habit title cannot be longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, DomainError> {
    match non_empty(description) {
        Some(desc) if desc.chars().count() > MAX_DESCRIPTION_LEN => Err(DomainError::validation(format!(
            "Description cannot be longer than {} characters",
            MAX_DESCRIPTION_LEN
        ))),
        other => Ok(other),
    }
}

fn validate_icon(icon: Option<String>) -> Result<Option<String>, DomainError> {
    match non_empty(icon) {
        Some(icon) if icon.chars().count() > MAX_ICON_LEN => Err(DomainError::validation(format!(
            "Icon cannot be longer than {} characters",
            MAX_ICON_LEN
        ))),
        other => Ok(other),
    }
}

/// Accept `#RGB` or `#RRGGBB`
fn validate_color(color: &str) -> Result<String, DomainError> {
    let trimmed = color.trim();
    let valid = trimmed
        .strip_prefix('#')
        .map(|hex| (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if !valid {
        return Err(DomainError::invalid_value(format!(
            "color '{}' must be a hex color like #3B82F6",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_date;

    fn created(date: &str) -> DateTime<Utc> {
        parse_date(date).unwrap().and_hms_opt(9, 0, 0).unwrap().and_utc()
    }

    fn mwf_draft(title: &str) -> HabitDraft {
        HabitDraft {
            title: title.to_string(),
            recurring_days: Some(vec![1, 3, 5]),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let habit = Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("Morning Run"), created("2024-01-01"))
            .unwrap();

        assert_eq!(habit.title, "Morning Run");
        assert_eq!(habit.color, DEFAULT_COLOR);
        assert_eq!(habit.target_days, 3);
        assert_eq!(habit.daily_goal, 1);
        assert_eq!(habit.schedule.schedule_type(), ScheduleType::Recurring);
        assert!(habit.is_active);
        assert_eq!(habit.created_on(), parse_date("2024-01-01").unwrap());
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let owner = OwnerId::new();
        let ws = WorkspaceId::new();

        assert!(Habit::new(owner, ws, mwf_draft("   "), created("2024-01-01")).is_err());

        let mut bad_color = mwf_draft("Read");
        bad_color.color = Some("blue".to_string());
        assert!(Habit::new(owner, ws, bad_color, created("2024-01-01")).is_err());

        let mut both = mwf_draft("Read");
        both.one_time_date = Some(parse_date("2024-02-01").unwrap());
        assert!(matches!(
            Habit::new(owner, ws, both, created("2024-01-01")),
            Err(DomainError::InvalidSchedule(_))
        ));

        let one_time_without_date = HabitDraft {
            title: "Dentist".to_string(),
            schedule_type: Some(ScheduleType::OneTime),
            ..Default::default()
        };
        assert!(Habit::new(owner, ws, one_time_without_date, created("2024-01-01")).is_err());
    }

    #[test]
    fn test_update_reports_version_relevant_changes() {
        let mut habit =
            Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("A"), created("2024-01-01")).unwrap();
        let now = created("2024-01-02");

        let description_only = HabitUpdate {
            description: Some("notes".to_string()),
            ..Default::default()
        };
        assert!(!habit.apply_update(description_only, now).unwrap());
        assert_eq!(habit.description.as_deref(), Some("notes"));

        let same_title = HabitUpdate {
            title: Some("A".to_string()),
            ..Default::default()
        };
        assert!(!habit.apply_update(same_title, now).unwrap());

        let rename = HabitUpdate {
            title: Some("B".to_string()),
            ..Default::default()
        };
        assert!(habit.apply_update(rename, now).unwrap());
        assert_eq!(habit.title, "B");
    }

    #[test]
    fn test_switching_schedule_type_clears_other_shape() {
        let mut habit =
            Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("A"), created("2024-01-01")).unwrap();

        let to_one_time = HabitUpdate {
            schedule_type: Some(ScheduleType::OneTime),
            one_time_date: Some(parse_date("2024-03-01").unwrap()),
            ..Default::default()
        };
        assert!(habit.apply_update(to_one_time, created("2024-01-02")).unwrap());
        assert_eq!(habit.schedule.recurring_days(), None);
        assert_eq!(habit.target_days, 1);

        let missing_days = HabitUpdate {
            schedule_type: Some(ScheduleType::Recurring),
            ..Default::default()
        };
        assert!(habit.apply_update(missing_days, created("2024-01-03")).is_err());
        assert_eq!(habit.schedule.schedule_type(), ScheduleType::OneTime);
    }

    #[test]
    fn test_update_with_text_and_schedule_together() {
        let mut habit =
            Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("A"), created("2024-01-01")).unwrap();

        let update = HabitUpdate {
            description: Some("evenings only".to_string()),
            icon: Some("moon".to_string()),
            recurring_days: Some(vec![0, 6]),
            ..Default::default()
        };
        assert!(habit.apply_update(update, created("2024-01-02")).unwrap());
        assert_eq!(habit.description.as_deref(), Some("evenings only"));
        assert_eq!(habit.icon.as_deref(), Some("moon"));
        assert_eq!(habit.schedule.recurring_days().map(|d| d.as_slice().to_vec()), Some(vec![0, 6]));
        assert_eq!(habit.target_days, 2);
    }

    #[test]
    fn test_non_positive_goals_are_ignored() {
        let mut habit =
            Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("A"), created("2024-01-01")).unwrap();

        let update = HabitUpdate {
            target_days: Some(0),
            daily_goal: Some(-2),
            ..Default::default()
        };
        habit.apply_update(update, created("2024-01-02")).unwrap();
        assert_eq!(habit.target_days, 3);
        assert_eq!(habit.daily_goal, 1);
    }

    #[test]
    fn test_habit_serializes_camel_case_with_schedule() {
        let habit =
            Habit::new(OwnerId::new(), WorkspaceId::new(), mwf_draft("A"), created("2024-01-01")).unwrap();
        let json = serde_json::to_value(&habit).unwrap();

        assert_eq!(json["scheduleType"], "recurring");
        assert_eq!(json["recurringDays"], serde_json::json!([1, 3, 5]));
        assert_eq!(json["targetDays"], 3);
        assert!(json.get("workspaceId").is_some());
    }
}
