//! Domain Models
//!
//! Calendar events and reminders, plus the argument helpers shared by the
//! tool providers. Times are naive local wall-clock times.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{PlannerError, Result};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A calendar event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub location: Option<String>,
}

impl Event {
    pub fn new(title: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            start,
            end: None,
            location: None,
        }
    }

    #[must_use]
    pub const fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// One-line rendering for tool output
    pub fn describe(&self) -> String {
        let mut line = format!("{}: {}", self.title, self.start.format(DISPLAY_FORMAT));
        if let Some(end) = self.end {
            let _ = write!(line, " to {}", end.format("%H:%M"));
        }
        if let Some(location) = &self.location {
            let _ = write!(line, " @ {location}");
        }
        line
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self.end {
            Some(end) if end < self.start => Err(PlannerError::InvalidRange {
                start: self.start.format(DISPLAY_FORMAT).to_string(),
                end: end.format(DISPLAY_FORMAT).to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// A to-do item with an optional due time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub due: Option<NaiveDateTime>,
    pub completed: bool,
}

impl Reminder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            due: None,
            completed: false,
        }
    }

    #[must_use]
    pub const fn with_due(mut self, due: NaiveDateTime) -> Self {
        self.due = Some(due);
        self
    }

    pub fn describe(&self) -> String {
        let mark = if self.completed { "[x]" } else { "[ ]" };
        match self.due {
            Some(due) => format!("{mark} {} (due {})", self.title, due.format(DISPLAY_FORMAT)),
            None => format!("{mark} {}", self.title),
        }
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM` or a bare date
/// (midnight).
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::default()))
        .map_err(|_| PlannerError::InvalidDate(input.to_string()))
}

/// Parse a calendar day; a full timestamp is accepted and truncated
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .or_else(|_| parse_datetime(input).map(|dt| dt.date()))
}

pub(crate) fn required_str<'a>(args: &'a Map<String, Value>, name: &'static str) -> Result<&'a str> {
    match args.get(name) {
        None | Some(Value::Null) => Err(PlannerError::MissingArgument(name)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(PlannerError::MissingArgument(name)),
        Some(Value::String(s)) => Ok(s.trim()),
        Some(_) => Err(PlannerError::InvalidArgument {
            name,
            expected: "string",
        }),
    }
}

pub(crate) fn optional_str<'a>(
    args: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(_) => Err(PlannerError::InvalidArgument {
            name,
            expected: "string",
        }),
    }
}

pub(crate) fn optional_bool(args: &Map<String, Value>, name: &'static str) -> Result<Option<bool>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(_) => Err(PlannerError::InvalidArgument {
            name,
            expected: "boolean",
        }),
    }
}
