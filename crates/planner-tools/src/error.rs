//! Error Types for Planner Tools
//!
//! These never escape as `Err` from a tool call. They are rendered into an
//! error `ToolOutput` so the model can read them and recover.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("Argument '{name}' must be a {expected}")]
    InvalidArgument {
        name: &'static str,
        expected: &'static str,
    },

    #[error("Invalid date '{0}': use RFC 3339 or YYYY-MM-DD[ HH:MM]")]
    InvalidDate(String),

    #[error("Event end {end} is before its start {start}")]
    InvalidRange { start: String, end: String },

    #[error("No event titled '{0}'")]
    EventNotFound(String),

    #[error("No reminder titled '{0}'")]
    ReminderNotFound(String),
}
