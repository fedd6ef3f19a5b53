//! Context Manager
//!
//! Owns the scratchpad for one conversation and keeps tool output from
//! growing without bound: once more than `max_tool_messages` tool messages
//! are held verbatim, the oldest ones are folded into a single synthetic
//! assistant summary. Exact output of compressed entries is not recoverable.

use serde_json::Value;

use crate::adapter::adapter_for;
use crate::message::{Role, ToolResult, UnifiedMessage};
use crate::provider::ProviderKind;

/// Default number of tool messages kept verbatim
pub const DEFAULT_MAX_TOOL_MESSAGES: usize = 4;

/// Tool messages folded per compression pass
pub const COMPRESSION_BATCH: usize = 2;

/// Characters of each result kept in the summary
pub const SUMMARY_PREVIEW_CHARS: usize = 100;

/// Ordered conversation buffer with automatic tool-history compression
#[derive(Clone, Debug)]
pub struct ContextManager {
    messages: Vec<UnifiedMessage>,
    max_tool_messages: usize,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    pub const fn new() -> Self {
        Self::with_threshold(DEFAULT_MAX_TOOL_MESSAGES)
    }

    pub const fn with_threshold(max_tool_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_tool_messages,
        }
    }

    /// Start with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut context = Self::new();
        context.add_message(UnifiedMessage::system(prompt));
        context
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.add_message(UnifiedMessage::user(text));
    }

    pub fn add_message(&mut self, message: UnifiedMessage) {
        self.messages.push(message);
        self.compress();
    }

    /// Append all results of one step as a single tool message
    pub fn add_tool_results(&mut self, results: Vec<ToolResult>) {
        if results.is_empty() {
            return;
        }
        self.add_message(UnifiedMessage::tool(results));
    }

    /// Make sure the conversation opens with `prompt` as its system message
    pub fn ensure_system_prompt(&mut self, prompt: &str) {
        if self.messages.first().map(|m| m.role) != Some(Role::System) {
            self.messages.insert(0, UnifiedMessage::system(prompt));
        }
    }

    pub fn messages(&self) -> &[UnifiedMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&UnifiedMessage> {
        self.messages.last()
    }

    /// Wire-ready messages for the given vendor
    pub fn current_messages(&self, kind: ProviderKind) -> Vec<Value> {
        adapter_for(kind).wire_messages(&self.messages)
    }

    pub fn tool_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_tool_bearing()).count()
    }

    pub const fn max_tool_messages(&self) -> usize {
        self.max_tool_messages
    }

    /// Fold the oldest tool messages into summaries until at most
    /// `max_tool_messages` remain. Returns whether anything changed.
    pub fn compress(&mut self) -> bool {
        let mut changed = false;
        while self.tool_message_count() > self.max_tool_messages {
            if !self.compress_oldest() {
                break;
            }
            changed = true;
        }
        changed
    }

    fn compress_oldest(&mut self) -> bool {
        let positions: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_tool_bearing())
            .map(|(i, _)| i)
            .take(COMPRESSION_BATCH)
            .collect();

        let Some(&first) = positions.first() else {
            return false;
        };

        let results: Vec<ToolResult> = positions
            .iter()
            .flat_map(|&i| self.messages[i].tool_results().into_iter().cloned())
            .collect();

        let summary = results
            .iter()
            .enumerate()
            .map(|(k, r)| {
                let status = if r.is_error { "failed" } else { "succeeded" };
                let preview: String = r.content.chars().take(SUMMARY_PREVIEW_CHARS).collect();
                format!("Tool execution {} {status}: {preview}", k + 1)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let summary = UnifiedMessage::assistant(summary)
            .with_metadata("compressed", "true")
            .with_metadata("original_count", results.len().to_string());

        // Remove back to front so earlier indices stay valid
        for &i in positions.iter().rev() {
            self.messages.remove(i);
        }
        self.messages.insert(first, summary);

        tracing::debug!(
            folded = positions.len(),
            results = results.len(),
            remaining = self.tool_message_count(),
            "compressed tool history"
        );
        true
    }

    /// Estimate total tokens in conversation
    pub fn estimate_tokens(&self) -> u32 {
        self.messages.iter().map(UnifiedMessage::estimate_tokens).sum()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Clear all messages except system prompt
    pub fn clear_history(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }
}
