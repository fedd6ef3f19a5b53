//! Service Kit - Agent Tools
//!
//! Tool providers that implement `agent_core::ToolProvider` for the planner.

mod calendar;
mod reminders;

pub use calendar::CalendarProvider;
pub use reminders::RemindersProvider;
