//! Reminders Tools
//!
//! To-do list with due dates and completion state.

use std::sync::Arc;

use agent_core::{AgentError, ParameterProperty, ToolDescriptor, ToolOutput, ToolProvider};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::{PlannerError, Result};
use crate::model::{Reminder, optional_bool, optional_str, parse_datetime, required_str};

/// Reminders tool provider
#[derive(Clone, Default)]
pub struct RemindersProvider {
    reminders: Arc<RwLock<Vec<Reminder>>>,
}

impl RemindersProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reminders(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: Arc::new(RwLock::new(reminders)),
        }
    }

    pub async fn reminders(&self) -> Vec<Reminder> {
        self.reminders.read().await.clone()
    }

    async fn list_reminders(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let include_completed = optional_bool(args, "include_completed")?.unwrap_or(false);

        let mut reminders: Vec<Reminder> = self
            .reminders
            .read()
            .await
            .iter()
            .filter(|r| include_completed || !r.completed)
            .cloned()
            .collect();
        // Dated first, earliest due first; undated keep insertion order
        reminders.sort_by_key(|r| (r.due.is_none(), r.due));

        if reminders.is_empty() {
            return Ok(ToolOutput::success("No reminders."));
        }

        let lines: Vec<String> = reminders.iter().map(|r| format!("- {}", r.describe())).collect();
        Ok(ToolOutput::success(format!("{} reminder(s):\n{}", reminders.len(), lines.join("\n")))
            .with_metadata("count", reminders.len().to_string()))
    }

    async fn create_reminder(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let mut reminder = Reminder::new(required_str(args, "title")?);
        if let Some(due) = optional_str(args, "due")? {
            reminder = reminder.with_due(parse_datetime(due)?);
        }

        let output = ToolOutput::success(format!("Created reminder {}", reminder.describe()))
            .with_metadata("reminder_id", reminder.id.clone());
        self.reminders.write().await.push(reminder);
        Ok(output)
    }

    async fn update_reminder(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;
        let new_title = optional_str(args, "new_title")?;
        let due = optional_str(args, "due")?.map(parse_datetime).transpose()?;

        let mut reminders = self.reminders.write().await;
        let reminder = find_mut(&mut reminders, title)?;
        if let Some(new_title) = new_title {
            reminder.title = new_title.to_string();
        }
        if due.is_some() {
            reminder.due = due;
        }
        Ok(ToolOutput::success(format!("Updated reminder {}", reminder.describe())))
    }

    async fn complete_reminder(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;

        let mut reminders = self.reminders.write().await;
        let reminder = find_mut(&mut reminders, title)?;
        if reminder.completed {
            return Ok(ToolOutput::success(format!(
                "Reminder '{}' was already completed",
                reminder.title
            )));
        }
        reminder.completed = true;
        Ok(ToolOutput::success(format!("Completed reminder '{}'", reminder.title)))
    }

    async fn delete_reminder(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let title = required_str(args, "title")?;

        let mut reminders = self.reminders.write().await;
        let index = reminders
            .iter()
            .position(|r| r.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| PlannerError::ReminderNotFound(title.to_string()))?;
        let removed = reminders.remove(index);
        Ok(ToolOutput::success(format!("Deleted reminder '{}'", removed.title)))
    }
}

fn find_mut<'a>(reminders: &'a mut [Reminder], title: &str) -> Result<&'a mut Reminder> {
    reminders
        .iter_mut()
        .find(|r| r.title.eq_ignore_ascii_case(title))
        .ok_or_else(|| PlannerError::ReminderNotFound(title.to_string()))
}

#[async_trait]
impl ToolProvider for RemindersProvider {
    fn name(&self) -> &str {
        "reminders"
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        let due = "Due date or date-time: RFC 3339 or YYYY-MM-DD HH:MM";
        let title = || ParameterProperty::string("Reminder title");
        vec![
            ToolDescriptor::new("list_reminders", "List open reminders.").param(
                "include_completed",
                ParameterProperty::boolean("Also list completed reminders"),
            ),
            ToolDescriptor::new("create_reminder", "Create a reminder.")
                .required_param("title", title())
                .param("due", ParameterProperty::string(due)),
            ToolDescriptor::new("update_reminder", "Rename or reschedule a reminder.")
                .required_param("title", title())
                .param("new_title", ParameterProperty::string("New title"))
                .param("due", ParameterProperty::string(due)),
            ToolDescriptor::new("complete_reminder", "Mark a reminder as done.")
                .required_param("title", title()),
            ToolDescriptor::new("delete_reminder", "Delete a reminder.")
                .required_param("title", title()),
        ]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> agent_core::Result<ToolOutput> {
        let result = match name {
            "list_reminders" => self.list_reminders(arguments).await,
            "create_reminder" => self.create_reminder(arguments).await,
            "update_reminder" => self.update_reminder(arguments).await,
            "complete_reminder" => self.complete_reminder(arguments).await,
            "delete_reminder" => self.delete_reminder(arguments).await,
            other => return Err(AgentError::ToolNotFound(other.to_string())),
        };
        Ok(result.unwrap_or_else(|e| ToolOutput::failure(e.to_string())))
    }
}
