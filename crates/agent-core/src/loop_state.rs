//! Agent loop state
//!
//! Audit records produced by the orchestrator, and the per-turn guard that
//! trips when a tool keeps failing the same way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::ToolResult;

/// One executed tool call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolExecution {
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub result_text: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

impl ToolExecution {
    /// The result block fed back to the model
    pub fn to_result(&self) -> ToolResult {
        ToolResult {
            tool_call_id: self.tool_call_id.clone(),
            content: self.result_text.clone(),
            is_error: self.is_error,
        }
    }
}

/// One orchestrator iteration. Returned to the caller, never read by the loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: usize,
    pub assistant_text: String,
    pub tool_executions: Vec<ToolExecution>,
}

/// Tracks the last tool outcome across executions of a turn, in call order
#[derive(Debug, Default)]
pub(crate) struct ErrorStreak {
    last_error: Option<String>,
}

impl ErrorStreak {
    /// Record an execution. Returns the error text when it repeats the
    /// previous execution's error.
    pub(crate) fn observe(&mut self, execution: &ToolExecution) -> Option<String> {
        if !execution.is_error {
            self.last_error = None;
            return None;
        }
        if self.last_error.as_deref() == Some(execution.result_text.as_str()) {
            return Some(execution.result_text.clone());
        }
        self.last_error = Some(execution.result_text.clone());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(is_error: bool, text: &str) -> ToolExecution {
        ToolExecution {
            tool_call_id: "c".into(),
            tool_name: "create_event".into(),
            arguments: Map::new(),
            result_text: text.into(),
            is_error,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_streak_trips_on_second_identical_error() {
        let mut streak = ErrorStreak::default();
        assert_eq!(streak.observe(&exec(true, "Permission denied")), None);
        assert_eq!(
            streak.observe(&exec(true, "Permission denied")).as_deref(),
            Some("Permission denied")
        );
    }

    #[test]
    fn test_streak_reset_by_success_or_different_error() {
        let mut streak = ErrorStreak::default();
        assert_eq!(streak.observe(&exec(true, "timeout")), None);
        assert_eq!(streak.observe(&exec(false, "ok")), None);
        assert_eq!(streak.observe(&exec(true, "timeout")), None);
        assert_eq!(streak.observe(&exec(true, "Permission denied")), None);
    }

    #[test]
    fn test_to_result() {
        let result = exec(true, "boom").to_result();
        assert!(result.is_error);
        assert_eq!(result.content, "boom");
    }
}
