//! # planner-tools
//!
//! Calendar and reminders tool providers for a personal planning assistant.
//!
//! ## Tools
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────┐
//! │  calendar                │  reminders                           │
//! ├──────────────────────────┼──────────────────────────────────────┤
//! │  list_events             │  list_reminders                      │
//! │  create_event            │  create_reminder                     │
//! │  update_event    confirm │  update_reminder             confirm │
//! │  delete_event    confirm │  complete_reminder           confirm │
//! │                          │  delete_reminder             confirm │
//! └──────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Tools marked `confirm` are gated by `agent_core::ToolGateway`'s default
//! confirmation set; they only run after the user approves.

pub mod error;
pub mod model;
pub mod svckit;

use std::sync::Arc;

use agent_core::ToolGateway;

pub use error::{PlannerError, Result};
pub use model::{Event, Reminder, parse_date, parse_datetime};
pub use svckit::{CalendarProvider, RemindersProvider};

/// Gateway with both planner providers registered
pub fn planner_gateway(calendar: CalendarProvider, reminders: RemindersProvider) -> ToolGateway {
    ToolGateway::new()
        .with_provider(Arc::new(calendar))
        .with_provider(Arc::new(reminders))
}

/// System prompt for the planning assistant
pub const PLANNER_SYSTEM_PROMPT: &str = r"You are a personal planning assistant that manages the user's calendar and reminders.

## How to Work

1. Look before you change: use `list_events` or `list_reminders` to find the exact title first
2. Use ISO dates (YYYY-MM-DD HH:MM) for every date argument
3. Batch independent lookups in one step; they run in parallel
4. Deleting, updating or completing items needs the user's approval; request the change and the user will be asked

## Answering

- Summarize what you found or changed in plain language
- If a tool reports an error, explain it and suggest a fix instead of retrying blindly
- Never invent events or reminders that a tool did not return";
