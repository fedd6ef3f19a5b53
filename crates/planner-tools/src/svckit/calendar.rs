//! Calendar Tools
//!
//! In-memory event store exposed as `list_events`, `create_event`,
//! `update_event` and `delete_event`. Events are addressed by title,
//! case-insensitively.

use std::fmt::Write;
use std::sync::Arc;

use agent_core::{AgentError, ParameterProperty, ToolDescriptor, ToolOutput, ToolProvider};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::{PlannerError, Result};
use crate::model::{Event, optional_str, parse_date, parse_datetime, required_str};

/// Calendar tool provider
#[derive(Clone, Default)]
pub struct CalendarProvider {
    events: Arc<RwLock<Vec<Event>>>,
}

impl CalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with existing events
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    /// Snapshot of the stored events
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    async fn list_events(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let day = optional_str(args, "date")?.map(parse_date).transpose()?;

        let mut events: Vec<Event> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| day.is_none_or(|d| e.start.date() == d))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);

        let scope = day.map_or_else(|| "in the calendar".to_string(), |d| format!("on {d}"));
        if events.is_empty() {
            return Ok(ToolOutput::success(format!("No events {scope}.")));
        }

        let mut output = format!("{} event(s) {scope}:", events.len());
        for event in &events {
            let _ = write!(output, "\n- {}", event.describe());
        }
        Ok(ToolOutput::success(output).with_metadata("count", events.len().to_string()))
    }

    async fn create_event(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;
        let start = parse_datetime(required_str(args, "start")?)?;

        let mut event = Event::new(title, start);
        if let Some(end) = optional_str(args, "end")? {
            event = event.with_end(parse_datetime(end)?);
        }
        if let Some(location) = optional_str(args, "location")? {
            event = event.with_location(location);
        }
        event.validate()?;

        let output = ToolOutput::success(format!("Created event {}", event.describe()))
            .with_metadata("event_id", event.id.clone());
        tracing::debug!(title = %event.title, "event created");
        self.events.write().await.push(event);
        Ok(output)
    }

    async fn update_event(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;
        let new_title = optional_str(args, "new_title")?;
        let start = optional_str(args, "start")?.map(parse_datetime).transpose()?;
        let end = optional_str(args, "end")?.map(parse_datetime).transpose()?;
        let location = optional_str(args, "location")?;

        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| PlannerError::EventNotFound(title.to_string()))?;

        let mut updated = event.clone();
        if let Some(new_title) = new_title {
            updated.title = new_title.to_string();
        }
        if let Some(start) = start {
            updated.start = start;
        }
        if end.is_some() {
            updated.end = end;
        }
        if let Some(location) = location {
            updated.location = Some(location.to_string());
        }
        updated.validate()?;

        *event = updated;
        Ok(ToolOutput::success(format!("Updated event {}", event.describe()))
            .with_metadata("event_id", event.id.clone()))
    }

    async fn delete_event(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;

        let mut events = self.events.write().await;
        let index = events
            .iter()
            .position(|e| e.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| PlannerError::EventNotFound(title.to_string()))?;
        let removed = events.remove(index);

        tracing::debug!(title = %removed.title, "event deleted");
        Ok(ToolOutput::success(format!("Deleted event '{}'", removed.title)))
    }
}

#[async_trait]
impl ToolProvider for CalendarProvider {
    fn name(&self) -> &str {
        "calendar"
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        let date = "Date or date-time: RFC 3339 or YYYY-MM-DD HH:MM";
        vec![
            ToolDescriptor::new("list_events", "List calendar events, optionally for one day.")
                .param("date", ParameterProperty::string("Day to list (YYYY-MM-DD)")),
            ToolDescriptor::new("create_event", "Create a calendar event.")
                .required_param("title", ParameterProperty::string("Event title"))
                .required_param("start", ParameterProperty::string(date))
                .param("end", ParameterProperty::string(date))
                .param("location", ParameterProperty::string("Where the event takes place")),
            ToolDescriptor::new("update_event", "Change an existing event, found by its title.")
                .required_param("title", ParameterProperty::string("Current event title"))
                .param("new_title", ParameterProperty::string("New title"))
                .param("start", ParameterProperty::string(date))
                .param("end", ParameterProperty::string(date))
                .param("location", ParameterProperty::string("New location")),
            ToolDescriptor::new("delete_event", "Delete an event, found by its title.")
                .required_param("title", ParameterProperty::string("Event title")),
        ]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> agent_core::Result<ToolOutput> {
        let result = match name {
            "list_events" => self.list_events(arguments).await,
            "create_event" => self.create_event(arguments).await,
            "update_event" => self.update_event(arguments).await,
            "delete_event" => self.delete_event(arguments).await,
            other => return Err(AgentError::ToolNotFound(other.to_string())),
        };
        Ok(result.unwrap_or_else(|e| ToolOutput::failure(e.to_string())))
    }
}
