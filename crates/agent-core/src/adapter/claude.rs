//! Claude-shaped messages
//!
//! Tool calls and tool results are content blocks: `tool_use` inside the
//! assistant message, `tool_result` inside a user message. The system prompt
//! is a top-level field, not a message. Roles must alternate, so adjacent
//! wire messages with the same role are merged.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ProviderAdapter, answered_call_ids};
use crate::error::{AgentError, Result};
use crate::message::{ContentBlock, Role, ToolCall, UnifiedMessage};
use crate::provider::{ProviderConfig, ProviderKind};
use crate::tool::ToolDescriptor;

/// Adapter for `/messages`
#[derive(Clone, Copy, Debug, Default)]
pub struct ClaudeAdapter;

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

/// Append `blocks` as a `role` message, folding into the previous wire
/// message when it has the same role.
fn push_merged(wire: &mut Vec<Value>, role: &str, mut blocks: Vec<Value>) {
    if blocks.is_empty() {
        return;
    }
    if let Some(last) = wire.last_mut() {
        if last["role"] == role {
            if let Some(existing) = last["content"].as_array_mut() {
                existing.append(&mut blocks);
                return;
            }
        }
    }
    wire.push(json!({ "role": role, "content": blocks }));
}

fn text_block(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn tool_spec(tool: &ToolDescriptor) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.to_json_schema(),
    })
}

impl ClaudeAdapter {
    /// System messages, joined. Carried out-of-band in the request.
    fn system_prompt(messages: &[UnifiedMessage]) -> Option<String> {
        let parts: Vec<String> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(UnifiedMessage::text_content)
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() { None } else { Some(parts.join("\n\n")) }
    }
}

impl ProviderAdapter for ClaudeAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn endpoint(&self) -> &'static str {
        "/messages"
    }

    fn wire_messages(&self, messages: &[UnifiedMessage]) -> Vec<Value> {
        let answered = answered_call_ids(messages);
        let mut wire: Vec<Value> = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System => {}
                Role::User => {
                    let text = msg.text_content();
                    if !text.is_empty() {
                        push_merged(&mut wire, "user", vec![text_block(&text)]);
                    }
                }
                // Text and tool_use blocks stay in one assistant message, in emission order
                Role::Assistant => {
                    let blocks = msg
                        .content
                        .iter()
                        .filter_map(|block| match block {
                            ContentBlock::Text { text } if !text.is_empty() => Some(text_block(text)),
                            ContentBlock::ToolCall(call) if answered.contains(call.id.as_str()) => {
                                Some(json!({
                                    "type": "tool_use",
                                    "id": call.id,
                                    "name": call.name,
                                    "input": Value::Object(call.arguments.clone()),
                                }))
                            }
                            _ => None,
                        })
                        .collect();
                    push_merged(&mut wire, "assistant", blocks);
                }
                // All results of a step go back as one user message
                Role::Tool => {
                    let blocks = msg
                        .tool_results()
                        .into_iter()
                        .filter(|r| answered.contains(r.tool_call_id.as_str()))
                        .map(|r| {
                            json!({
                                "type": "tool_result",
                                "tool_use_id": r.tool_call_id,
                                "content": r.content,
                                "is_error": r.is_error,
                            })
                        })
                        .collect();
                    push_merged(&mut wire, "user", blocks);
                }
            }
        }

        wire
    }

    fn to_request(
        &self,
        messages: &[UnifiedMessage],
        tools: &[ToolDescriptor],
        config: &ProviderConfig,
    ) -> Value {
        let mut body = json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": self.wire_messages(messages),
        });

        if let Some(system) = Self::system_prompt(messages) {
            body["system"] = Value::String(system);
        }

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_spec).collect());
        }

        body
    }

    fn from_response(&self, response: &Value) -> Result<UnifiedMessage> {
        let parsed = MessagesResponse::deserialize(response)
            .map_err(|e| AgentError::VendorParse(format!("messages response: {e}")))?;

        let mut blocks = Vec::with_capacity(parsed.content.len());
        for block in parsed.content {
            match block {
                ResponseBlock::Text { text } => blocks.push(ContentBlock::text(text)),
                ResponseBlock::ToolUse { id, name, input } => {
                    let arguments = match input {
                        Value::Object(map) => map,
                        // Claude rejects null input on replay; normalise to {}
                        Value::Null => Map::new(),
                        other => {
                            return Err(AgentError::VendorParse(format!(
                                "tool_use input for '{name}' is not an object: {other}"
                            )));
                        }
                    };
                    blocks.push(ContentBlock::ToolCall(ToolCall::new(id, name, arguments)));
                }
                ResponseBlock::Unsupported => {}
            }
        }

        let mut message = UnifiedMessage::assistant_with_blocks(blocks)
            .with_metadata("provider", ProviderKind::Claude.as_str());
        if let Some(model) = parsed.model {
            message = message.with_metadata("model", model);
        }
        if let Some(reason) = parsed.stop_reason {
            message = message.with_metadata("stop_reason", reason);
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolResult;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn config() -> ProviderConfig {
        ProviderConfig::new(ProviderKind::Claude, "key").with_model("claude-3-5-sonnet-latest")
    }

    #[test]
    fn test_system_out_of_band() {
        let body = ClaudeAdapter.to_request(
            &[UnifiedMessage::system("You are a planner."), UnifiedMessage::user("hi")],
            &[],
            &config(),
        );
        assert_eq!(body["system"], "You are a planner.");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_text_and_tool_use_in_one_assistant_message() {
        let messages = vec![
            UnifiedMessage::user("Plan my day"),
            UnifiedMessage::assistant_with_blocks(vec![
                ContentBlock::text("Checking both lists."),
                ContentBlock::ToolCall(ToolCall::new("t1", "list_events", Map::new())),
                ContentBlock::ToolCall(ToolCall::new("t2", "list_reminders", Map::new())),
            ]),
            UnifiedMessage::tool(vec![
                ToolResult::success("t1", "Standup 9:00"),
                ToolResult::failure("t2", "Permission denied"),
            ]),
        ];

        let wire = ClaudeAdapter.wire_messages(&messages);
        assert_eq!(wire.len(), 3);

        let assistant = wire[1]["content"].as_array().unwrap();
        assert_eq!(assistant.len(), 3);
        assert_eq!(assistant[0]["type"], "text");
        assert_eq!(assistant[1]["type"], "tool_use");
        assert_eq!(assistant[1]["input"], json!({}));

        assert_eq!(wire[2]["role"], "user");
        let results = wire[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["tool_use_id"], "t1");
        assert_eq!(results[1]["is_error"], true);
    }

    #[test]
    fn test_adjacent_roles_merged() {
        let messages = vec![
            UnifiedMessage::user("first"),
            UnifiedMessage::assistant_with_blocks(vec![ContentBlock::ToolCall(ToolCall::new(
                "t1",
                "list_events",
                Map::new(),
            ))]),
            UnifiedMessage::tool(vec![ToolResult::success("t1", "none")]),
            UnifiedMessage::user("and reminders?"),
            UnifiedMessage::assistant("Summary of earlier work"),
            UnifiedMessage::assistant("Nothing due."),
        ];

        let wire = ClaudeAdapter.wire_messages(&messages);
        let roles: Vec<&str> = wire.iter().filter_map(|m| m["role"].as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
        // tool_result block precedes the follow-up text
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[2]["content"][1]["type"], "text");
        assert_eq!(wire[3]["content"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_late_result_does_not_reopen_call() {
        let messages = vec![
            UnifiedMessage::user("Delete the dentist"),
            UnifiedMessage::assistant_with_blocks(vec![ContentBlock::ToolCall(ToolCall::new(
                "t1",
                "delete_event",
                args(json!({"title": "Dentist"})),
            ))]),
            UnifiedMessage::user("Actually, what's on Friday?"),
            UnifiedMessage::assistant("Nothing on Friday."),
            UnifiedMessage::tool(vec![ToolResult::success("t1", "Deleted event 'Dentist'")]),
            UnifiedMessage::user("Thanks"),
        ];

        let wire = ClaudeAdapter.wire_messages(&messages);
        let roles: Vec<&str> = wire.iter().filter_map(|m| m["role"].as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        let types: Vec<&str> = wire
            .iter()
            .flat_map(|m| m["content"].as_array().into_iter().flatten())
            .filter_map(|b| b["type"].as_str())
            .collect();
        assert!(types.iter().all(|t| *t == "text"));
    }

    #[test]
    fn test_from_response_mixed_blocks() {
        let response = json!({
            "model": "claude-3-5-sonnet-latest",
            "stop_reason": "tool_use",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "I'll delete it."},
                {"type": "tool_use", "id": "toolu_1", "name": "delete_event", "input": {"title": "Dentist"}}
            ]
        });

        let msg = ClaudeAdapter.from_response(&response).unwrap();
        assert_eq!(msg.text_content(), "I'll delete it.");
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].str_arg("title"), Some("Dentist"));
        assert_eq!(msg.metadata.get("stop_reason").map(String::as_str), Some("tool_use"));
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            ClaudeAdapter.from_response(&json!({"id": "msg_1"})),
            Err(AgentError::VendorParse(_))
        ));
        assert!(matches!(
            ClaudeAdapter.from_response(&json!({"content": [{"type": "tool_use", "id": "x", "name": "t", "input": "oops"}]})),
            Err(AgentError::VendorParse(_))
        ));
    }

    #[test]
    fn test_round_trip_preserves_call() {
        let original = ToolCall::new(
            "toolu_9",
            "create_event",
            args(json!({"title": "Review", "start": "2026-10-19T10:00:00Z", "attendees": ["a", "b"]})),
        );
        let messages = vec![
            UnifiedMessage::assistant_with_blocks(vec![
                ContentBlock::text("Booking."),
                ContentBlock::ToolCall(original.clone()),
            ]),
            UnifiedMessage::tool(vec![ToolResult::success("toolu_9", "ok")]),
        ];
        let wire = ClaudeAdapter.wire_messages(&messages);
        let response = json!({ "content": wire[0]["content"].clone() });

        let decoded = ClaudeAdapter.extract_tool_calls(&response).unwrap();
        assert_eq!(decoded, vec![original]);
    }
}
