//! Scripted doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use agent_core::{
    AgentError, LlmProvider, ParameterProperty, ProviderConfig, Result, ToolDescriptor,
    ToolOutput, ToolProvider,
};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Replays canned vendor responses and records every request body
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Value>>>,
    pub requests: Mutex<Vec<Value>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, error: AgentError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> Value {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, _endpoint: &str, body: &Value, _config: &ProviderConfig) -> Result<Value> {
        self.requests.lock().unwrap().push(body.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::ProviderUnavailable("script exhausted".into())))
    }
}

/// OpenAI reply carrying only text
pub fn openai_text(text: &str) -> Value {
    json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    })
}

/// OpenAI reply carrying tool calls, given as (id, name, arguments)
pub fn openai_calls(calls: &[(&str, &str, Value)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": args.to_string() }
            })
        })
        .collect();
    json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": { "role": "assistant", "content": null, "tool_calls": tool_calls },
            "finish_reason": "tool_calls"
        }]
    })
}

/// Claude reply with optional text and tool_use blocks
pub fn claude_reply(text: Option<&str>, calls: &[(&str, &str, Value)]) -> Value {
    let mut content = Vec::new();
    if let Some(text) = text {
        content.push(json!({ "type": "text", "text": text }));
    }
    for (id, name, input) in calls {
        content.push(json!({ "type": "tool_use", "id": id, "name": name, "input": input }));
    }
    json!({
        "model": "claude-3-5-sonnet-latest",
        "stop_reason": if calls.is_empty() { "end_turn" } else { "tool_use" },
        "content": content
    })
}

/// Calendar double. `fail_with` makes every call return that error text.
#[derive(Default)]
pub struct FakeCalendar {
    pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
    pub fail_with: Option<String>,
}

impl FakeCalendar {
    pub fn failing(error: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(error.into()),
        }
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

#[async_trait]
impl ToolProvider for FakeCalendar {
    fn name(&self) -> &str {
        "calendar"
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("list_events", "List events")
                .param("date", ParameterProperty::string("YYYY-MM-DD")),
            ToolDescriptor::new("create_event", "Create an event")
                .required_param("title", ParameterProperty::string("Event title")),
            ToolDescriptor::new("delete_event", "Delete an event")
                .required_param("title", ParameterProperty::string("Event title")),
        ]
    }

    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if let Some(error) = &self.fail_with {
            return Ok(ToolOutput::failure(error.clone()));
        }
        Ok(match name {
            "list_events" => ToolOutput::success("09:00 Standup\n14:00 Dentist"),
            "delete_event" => ToolOutput::success(format!(
                "Deleted event '{}'",
                arguments.get("title").and_then(Value::as_str).unwrap_or_default()
            )),
            other => ToolOutput::success(format!("{other} done")),
        })
    }
}
