/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, HabitVersion, Completion)
/// together with the pure scheduling and streak algorithms. Nothing in here
/// touches the database; every decision is a function of its inputs.

pub mod habit;
pub mod completion;
pub mod schedule;
pub mod streak;
pub mod types;
pub mod version;

// Re-export public types for easy access
pub use habit::*;
pub use completion::*;
pub use schedule::*;
pub use streak::*;
pub use types::*;
pub use version::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit title: {0}")]
    InvalidTitle(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}

impl DomainError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub(crate) fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue { message: message.into() }
    }
}
