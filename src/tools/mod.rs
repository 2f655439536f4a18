/// MCP tools for habit management
///
/// This module contains the operations external clients can call. Each tool
/// lives in its own file, takes the caller identity explicitly and returns
/// a typed [`ToolError`] whose [`ErrorKind`] decides how the failure is
/// reported on the wire.

pub mod calendar;
pub mod completions;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod log;
pub mod stats;
pub mod update;

// Re-export tool functions for easy access
pub use calendar::*;
pub use completions::*;
pub use create::*;
pub use delete::*;
pub use get::*;
pub use list::*;
pub use log::*;
pub use stats::*;
pub use update::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DomainError, HabitId, OwnerId, WorkspaceId};
use crate::storage::StorageError;

/// Caller-facing failure of a tool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The habit does not exist or belongs to another owner/workspace
    #[error("Habit not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Lost a write race; the caller may retry
    #[error("Conflicting concurrent update: {0}")]
    Conflict(String),

    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure categories as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Integrity,
    Internal,
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::Validation(_) => ErrorKind::Validation,
            ToolError::Conflict(_) => ErrorKind::Conflict,
            ToolError::Integrity(_) => ErrorKind::Integrity,
            ToolError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the failure lies with the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Validation)
    }
}

impl From<DomainError> for ToolError {
    fn from(err: DomainError) -> Self {
        ToolError::Validation(err.to_string())
    }
}

impl From<StorageError> for ToolError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::HabitNotFound { habit_id } => ToolError::NotFound(habit_id),
            StorageError::Conflict(message) => ToolError::Conflict(message),
            StorageError::Integrity(message) => ToolError::Integrity(message),
            other => ToolError::Internal(other.to_string()),
        }
    }
}

/// Who is making a request: every read and write is scoped to this pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub owner_id: OwnerId,
    pub workspace_id: WorkspaceId,
}

impl Caller {
    pub fn new(owner_id: OwnerId, workspace_id: WorkspaceId) -> Self {
        Self { owner_id, workspace_id }
    }
}

/// Run a tool, retrying it once if it lost a write race
pub fn with_conflict_retry<T, F>(mut op: F) -> Result<T, ToolError>
where
    F: FnMut() -> Result<T, ToolError>,
{
    match op() {
        Err(ToolError::Conflict(message)) => {
            tracing::warn!("Retrying after write conflict: {}", message);
            op()
        }
        result => result,
    }
}

/// Parse a habit id supplied by a client
///
/// A malformed id cannot name any habit, so it is reported as not found.
pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, ToolError> {
    HabitId::from_string(raw.trim()).map_err(|_| ToolError::NotFound(raw.to_string()))
}

pub fn parse_owner_id(raw: &str) -> Result<OwnerId, ToolError> {
    OwnerId::from_string(raw.trim()).map_err(|_| ToolError::Validation(format!("Invalid owner id '{}'", raw)))
}

pub fn parse_workspace_id(raw: &str) -> Result<WorkspaceId, ToolError> {
    WorkspaceId::from_string(raw.trim())
        .map_err(|_| ToolError::Validation(format!("Invalid workspace id '{}'", raw)))
}
