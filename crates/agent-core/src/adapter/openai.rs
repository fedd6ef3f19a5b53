//! OpenAI-shaped chat completions
//!
//! Assistant tool calls travel in a `tool_calls` array next to `content`,
//! with arguments encoded as a JSON *string*. Each tool result is its own
//! `tool` message keyed by `tool_call_id`.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ProviderAdapter, answered_call_ids};
use crate::error::{AgentError, Result};
use crate::message::{ContentBlock, Role, ToolCall, UnifiedMessage};
use crate::provider::{ProviderConfig, ProviderKind};
use crate::tool::ToolDescriptor;

/// Adapter for `/chat/completions`
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiAdapter;

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Decode the JSON-string argument encoding. Empty means no arguments.
fn parse_arguments(tool: &str, raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(AgentError::VendorParse(format!(
            "arguments for '{tool}' are not an object: {other}"
        ))),
        Err(e) => Err(AgentError::VendorParse(format!(
            "arguments for '{tool}' are not valid JSON: {e}"
        ))),
    }
}

fn tool_spec(tool: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.to_json_schema(),
        }
    })
}

impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn endpoint(&self) -> &'static str {
        "/chat/completions"
    }

    fn wire_messages(&self, messages: &[UnifiedMessage]) -> Vec<Value> {
        let answered = answered_call_ids(messages);
        let mut wire = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::System | Role::User => wire.push(json!({
                    "role": msg.role.to_string(),
                    "content": msg.text_content(),
                })),
                Role::Assistant => {
                    let text = msg.text_content();
                    let calls: Vec<Value> = msg
                        .tool_calls()
                        .into_iter()
                        .filter(|c| answered.contains(c.id.as_str()))
                        .map(|c| {
                            json!({
                                "id": c.id,
                                "type": "function",
                                "function": {
                                    "name": c.name,
                                    "arguments": Value::Object(c.arguments.clone()).to_string(),
                                }
                            })
                        })
                        .collect();

                    if text.is_empty() && calls.is_empty() {
                        continue;
                    }

                    let content = if text.is_empty() { Value::Null } else { Value::String(text) };
                    let mut entry = json!({ "role": "assistant", "content": content });
                    if !calls.is_empty() {
                        entry["tool_calls"] = Value::Array(calls);
                    }
                    wire.push(entry);
                }
                // One wire message per result
                Role::Tool => {
                    let results = msg.tool_results().into_iter();
                    for result in results.filter(|r| answered.contains(r.tool_call_id.as_str())) {
                        wire.push(json!({
                            "role": "tool",
                            "tool_call_id": result.tool_call_id,
                            "content": result.content,
                        }));
                    }
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
            "messages": self.wire_messages(messages),
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_spec).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }

    fn from_response(&self, response: &Value) -> Result<UnifiedMessage> {
        let parsed = ChatResponse::deserialize(response)
            .map_err(|e| AgentError::VendorParse(format!("chat completion: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::VendorParse("response has no choices".into()))?;

        let mut blocks = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            blocks.push(ContentBlock::text(text));
        }
        for call in choice.message.tool_calls.unwrap_or_default() {
            let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
            blocks.push(ContentBlock::ToolCall(ToolCall::new(
                call.id,
                call.function.name,
                arguments,
            )));
        }

        let mut message = UnifiedMessage::assistant_with_blocks(blocks)
            .with_metadata("provider", ProviderKind::OpenAi.as_str());
        if let Some(model) = parsed.model {
            message = message.with_metadata("model", model);
        }
        if let Some(reason) = choice.finish_reason {
            message = message.with_metadata("finish_reason", reason);
        }
        Ok(message)
    }
}
