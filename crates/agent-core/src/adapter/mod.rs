//! Provider Adapters
//!
//! Bidirectional converters between [`UnifiedMessage`] and each vendor's
//! request/response JSON. Adapters are pure: no I/O, no state.

mod claude;
mod openai;

pub use claude::ClaudeAdapter;
pub use openai::OpenAiAdapter;

use std::collections::HashSet;

use serde_json::Value;

use crate::error::Result;
use crate::message::{Role, ToolCall, UnifiedMessage};
use crate::provider::{ProviderConfig, ProviderKind};
use crate::tool::ToolDescriptor;

/// Converter between the unified model and one vendor wire format
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Path appended to the provider base URL
    fn endpoint(&self) -> &'static str;

    /// Wire-ready message array (Claude excludes system messages here)
    fn wire_messages(&self, messages: &[UnifiedMessage]) -> Vec<Value>;

    /// Full request body
    fn to_request(
        &self,
        messages: &[UnifiedMessage],
        tools: &[ToolDescriptor],
        config: &ProviderConfig,
    ) -> Value;

    /// Decode a vendor response into one assistant message
    fn from_response(&self, response: &Value) -> Result<UnifiedMessage>;

    fn extract_tool_calls(&self, response: &Value) -> Result<Vec<ToolCall>> {
        Ok(self
            .from_response(response)?
            .tool_calls()
            .into_iter()
            .cloned()
            .collect())
    }
}

static OPENAI: OpenAiAdapter = OpenAiAdapter;
static CLAUDE: ClaudeAdapter = ClaudeAdapter;

/// Adapter for a provider kind
pub fn adapter_for(kind: ProviderKind) -> &'static dyn ProviderAdapter {
    match kind {
        ProviderKind::OpenAi => &OPENAI,
        ProviderKind::Claude => &CLAUDE,
    }
}

/// Ids of tool calls answered by the tool messages directly after them.
///
/// A call only counts as answered when its result sits in the run of tool
/// messages that immediately follows the assistant message carrying it. Calls
/// without such a result (a step paused for confirmation, results folded away
/// by compression, or a result appended after the conversation moved on) are
/// left off the wire, and so are results with no adjacent call: both vendors
/// reject a call that is not answered right away.
pub(crate) fn answered_call_ids(messages: &[UnifiedMessage]) -> HashSet<&str> {
    let mut answered = HashSet::new();
    let mut open: HashSet<&str> = HashSet::new();

    for msg in messages {
        match msg.role {
            Role::Assistant => {
                open = msg.tool_calls().into_iter().map(|c| c.id.as_str()).collect();
            }
            Role::Tool => {
                for result in msg.tool_results() {
                    let id = result.tool_call_id.as_str();
                    if open.contains(id) {
                        answered.insert(id);
                    }
                }
            }
            Role::System | Role::User => open.clear(),
        }
    }

    answered
}
