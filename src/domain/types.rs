/// Core types and enums used throughout the domain layer
///
/// This module defines the identifier types, the schedule shape of a habit,
/// the preferred-time coding, and the date helpers that keep every component
/// working on UTC calendar days.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Literal format for every date crossing the public surface
pub const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its string form (database or tool input)
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_string(s)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a habit
    ///
    /// Wrapping the UUID keeps a habit id from being passed where an owner
    /// or workspace id is expected.
    HabitId
);

uuid_id!(
    /// Unique identifier for a completion record
    CompletionId
);

uuid_id!(
    /// The user that owns habits and completions
    OwnerId
);

uuid_id!(
    /// The tenant workspace a habit lives in
    WorkspaceId
);

/// Today's date in the canonical zone (UTC)
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Normalize an instant in any zone to its UTC calendar day
pub fn normalize_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.with_timezone(&Utc).date_naive()
}

/// A timestamp that falls on `date`, carrying the current wall-clock time
///
/// Used to stamp records created "as of" a given day so that the day part
/// of the timestamp always matches the calendar day the caller asked for.
pub fn timestamp_on(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(Utc::now().time()).and_utc()
}

/// Parse a `YYYY-MM-DD` literal
pub fn parse_date(input: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(format!("'{}' is not a YYYY-MM-DD date", input)))
}

/// Parse an optional date literal, defaulting to `today` when absent or empty
pub fn parse_date_or(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate, DomainError> {
    match input.map(str::trim) {
        None | Some("") => Ok(today),
        Some(s) => parse_date(s),
    }
}

/// Resolve an inclusive date range from optional literals
///
/// When either bound is missing the range is the first of the current month
/// through today. A reversed range is swapped rather than rejected.
pub fn resolve_date_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), DomainError> {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());

    match (start, end) {
        (Some(start), Some(end)) => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            Ok(if end < start { (end, start) } else { (start, end) })
        }
        _ => Ok((first_of_month(today), today)),
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Weekday number of a date, 0 = Sunday through 6 = Saturday
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Categories for organizing habits into different life areas
///
/// The predefined names cover the common cases; anything else is kept
/// verbatim as a custom category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    Health,
    Productivity,
    Social,
    Creative,
    Mindfulness,
    Financial,
    Household,
    Personal,
    /// User-defined category with custom name
    Custom(String),
}

impl Category {
    /// Parse a category name; empty input means "no category"
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let category = match trimmed.to_lowercase().as_str() {
            "health" => Category::Health,
            "productivity" => Category::Productivity,
            "social" => Category::Social,
            "creative" => Category::Creative,
            "mindfulness" => Category::Mindfulness,
            "financial" => Category::Financial,
            "household" => Category::Household,
            "personal" => Category::Personal,
            _ => Category::Custom(trimmed.to_string()),
        };
        Some(category)
    }

    /// Get the stored/display name for this category
    pub fn as_str(&self) -> &str {
        match self {
            Category::Health => "health",
            Category::Productivity => "productivity",
            Category::Social => "social",
            Category::Creative => "creative",
            Category::Mindfulness => "mindfulness",
            Category::Financial => "financial",
            Category::Household => "household",
            Category::Personal => "personal",
            Category::Custom(name) => name,
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value).unwrap_or(Category::Custom(value))
    }
}

/// Which of the two schedule shapes a habit uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Recurring,
    OneTime,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Recurring => "recurring",
            ScheduleType::OneTime => "one_time",
        }
    }

    /// Parse the stored/wire name; anything else is rejected
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "recurring" => Some(ScheduleType::Recurring),
            "one_time" => Some(ScheduleType::OneTime),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty, sorted, duplicate-free set of weekday numbers (0 = Sunday)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RecurringDays(Vec<u8>);

impl RecurringDays {
    pub fn new(mut days: Vec<u8>) -> Result<Self, DomainError> {
        if days.is_empty() {
            return Err(DomainError::InvalidSchedule(
                "recurringDays must contain at least one weekday".to_string(),
            ));
        }
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(DomainError::InvalidSchedule(format!(
                "weekday {} is out of range (0=Sunday .. 6=Saturday)",
                bad
            )));
        }
        days.sort_unstable();
        days.dedup();
        Ok(Self(days))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&(weekday.num_days_from_sunday() as u8))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact digit string ("135" for Mon/Wed/Fri) for weekday matching in SQL
    pub fn digits(&self) -> String {
        self.0.iter().map(|d| char::from(b'0' + d)).collect()
    }
}

impl TryFrom<Vec<u8>> for RecurringDays {
    type Error = DomainError;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<RecurringDays> for Vec<u8> {
    fn from(days: RecurringDays) -> Self {
        days.0
    }
}

/// When a habit is due: a set of weekdays or a single calendar date
///
/// Exactly one shape is populated; construction through [`Schedule::from_parts`]
/// rejects inputs carrying both or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheduleType", rename_all = "snake_case")]
pub enum Schedule {
    Recurring {
        #[serde(rename = "recurringDays")]
        recurring_days: RecurringDays,
    },
    OneTime {
        #[serde(rename = "oneTimeDate")]
        one_time_date: NaiveDate,
    },
}

impl Schedule {
    pub fn from_parts(
        schedule_type: ScheduleType,
        recurring_days: Option<Vec<u8>>,
        one_time_date: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        let recurring_days = recurring_days.filter(|days| !days.is_empty());

        match (schedule_type, recurring_days, one_time_date) {
            (_, Some(_), Some(_)) => Err(DomainError::InvalidSchedule(
                "recurringDays and oneTimeDate are mutually exclusive".to_string(),
            )),
            (ScheduleType::Recurring, Some(days), None) => Ok(Schedule::Recurring {
                recurring_days: RecurringDays::new(days)?,
            }),
            (ScheduleType::Recurring, None, Some(_)) => Err(DomainError::InvalidSchedule(
                "a recurring schedule cannot carry oneTimeDate".to_string(),
            )),
            (ScheduleType::Recurring, None, None) => Err(DomainError::InvalidSchedule(
                "recurringDays is required for recurring schedule type".to_string(),
            )),
            (ScheduleType::OneTime, None, Some(date)) => Ok(Schedule::OneTime { one_time_date: date }),
            (ScheduleType::OneTime, Some(_), None) => Err(DomainError::InvalidSchedule(
                "a one_time schedule cannot carry recurringDays".to_string(),
            )),
            (ScheduleType::OneTime, None, None) => Err(DomainError::InvalidSchedule(
                "oneTimeDate is required for one_time schedule type".to_string(),
            )),
        }
    }

    pub fn schedule_type(&self) -> ScheduleType {
        match self {
            Schedule::Recurring { .. } => ScheduleType::Recurring,
            Schedule::OneTime { .. } => ScheduleType::OneTime,
        }
    }

    pub fn recurring_days(&self) -> Option<&RecurringDays> {
        match self {
            Schedule::Recurring { recurring_days } => Some(recurring_days),
            Schedule::OneTime { .. } => None,
        }
    }

    pub fn one_time_date(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Recurring { .. } => None,
            Schedule::OneTime { one_time_date } => Some(*one_time_date),
        }
    }

    /// Default target day count: one per scheduled weekday, or 1 for a one-off
    pub fn default_target_days(&self) -> u32 {
        match self {
            Schedule::Recurring { recurring_days } => recurring_days.len() as u32,
            Schedule::OneTime { .. } => 1,
        }
    }
}

/// Preferred time of day for a habit
///
/// Day parts are stored as fixed clock times so that listings can be ordered
/// by time; a literal clock time is kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
    At(NaiveTime),
}

impl PreferredTime {
    /// Parse caller input; empty or "any" means no preference
    pub fn parse(input: &str) -> Result<Option<Self>, DomainError> {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "any" => Ok(None),
            "morning" => Ok(Some(PreferredTime::Morning)),
            "afternoon" => Ok(Some(PreferredTime::Afternoon)),
            "evening" => Ok(Some(PreferredTime::Evening)),
            _ => parse_clock_time(trimmed).map(|t| Some(PreferredTime::At(t))).ok_or_else(|| {
                DomainError::invalid_value(format!(
                    "preferredTime '{}' must be morning, afternoon, evening, any or HH:MM[:SS]",
                    trimmed
                ))
            }),
        }
    }

    /// Clock time persisted for this preference
    pub fn to_storage(&self) -> String {
        match self {
            PreferredTime::Morning => "08:00:00".to_string(),
            PreferredTime::Afternoon => "14:00:00".to_string(),
            PreferredTime::Evening => "20:00:00".to_string(),
            PreferredTime::At(time) => time.format("%H:%M:%S").to_string(),
        }
    }

    /// Map a persisted clock time back to a day part where one matches
    pub fn from_storage(stored: &str) -> Result<Self, DomainError> {
        match stored.trim() {
            "08:00:00" | "08:00" => Ok(PreferredTime::Morning),
            "14:00:00" | "14:00" => Ok(PreferredTime::Afternoon),
            "20:00:00" | "20:00" => Ok(PreferredTime::Evening),
            other => parse_clock_time(other)
                .map(PreferredTime::At)
                .ok_or_else(|| DomainError::invalid_value(format!("stored preferred time '{}' is not a clock time", other))),
        }
    }

    pub fn label(&self) -> String {
        match self {
            PreferredTime::Morning => "morning".to_string(),
            PreferredTime::Afternoon => "afternoon".to_string(),
            PreferredTime::Evening => "evening".to_string(),
            PreferredTime::At(time) => time.format("%H:%M").to_string(),
        }
    }
}

impl From<PreferredTime> for String {
    fn from(time: PreferredTime) -> Self {
        time.label()
    }
}

impl TryFrom<String> for PreferredTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PreferredTime::parse(&value)?
            .ok_or_else(|| DomainError::invalid_value("preferredTime cannot be empty"))
    }
}

/// Parse `HH:MM:SS` or `HH:MM`
pub(crate) fn parse_clock_time(input: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}
