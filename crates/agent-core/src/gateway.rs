//! Tool Execution Gateway
//!
//! Routes tool calls to the provider that owns the tool name and turns every
//! outcome into a [`ToolExecution`]. Destructive tools are never run here
//! directly: they come back as [`PendingAction`]s until the user confirms.
//!
//! ```text
//!   ToolCall ──▶ plan() ──┬─▶ Immediate ──▶ execute_all() ──▶ ToolResult[] (call order)
//!                         └─▶ Confirm(PendingAction[]) ──▶ caller ──▶ execute_confirmed()
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::loop_state::ToolExecution;
use crate::message::{ToolCall, ToolResult};
use crate::tool::{ToolDescriptor, ToolProvider};

/// Why an action needs the user's approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingActionKind {
    Delete,
    Update,
    Complete,
    /// Not gated itself, but requested in the same step as a gated call
    Execute,
}

impl PendingActionKind {
    const fn verb(self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Update => "Update",
            Self::Complete => "Complete",
            Self::Execute => "Run",
        }
    }
}

/// A tool call held back until the user confirms it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PendingActionKind,
    pub tool_name: String,
    pub tool_call_id: String,
    pub arguments: Map<String, Value>,
    pub title: String,
    pub details: String,
}

impl PendingAction {
    pub fn from_call(call: &ToolCall, kind: PendingActionKind) -> Self {
        // "delete_event" -> "event"
        let subject = call
            .name
            .split_once('_')
            .map_or(call.name.as_str(), |(_, rest)| rest)
            .replace('_', " ");

        let title = match call.str_arg("title") {
            Some(name) => format!("{} {subject} \"{name}\"", kind.verb()),
            None => format!("{} {subject}", kind.verb()),
        };

        let details = call
            .arguments
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            tool_name: call.name.clone(),
            tool_call_id: call.id.clone(),
            arguments: call.arguments.clone(),
            title,
            details,
        }
    }

    fn to_call(&self) -> ToolCall {
        ToolCall::new(self.tool_call_id.clone(), self.tool_name.clone(), self.arguments.clone())
    }
}

/// How a step's tool calls should be handled
#[derive(Clone, Debug)]
pub enum DispatchPlan {
    /// Run every call now
    Immediate,
    /// At least one call is gated: the whole step waits for the user
    Confirm(Vec<PendingAction>),
}

/// Tools that always require explicit confirmation
pub const DEFAULT_CONFIRMATION_TOOLS: &[(&str, PendingActionKind)] = &[
    ("delete_event", PendingActionKind::Delete),
    ("delete_reminder", PendingActionKind::Delete),
    ("update_event", PendingActionKind::Update),
    ("update_reminder", PendingActionKind::Update),
    ("complete_reminder", PendingActionKind::Complete),
];

/// Routes calls to providers. Stateless per call; share it behind an `Arc`.
pub struct ToolGateway {
    providers: Vec<Arc<dyn ToolProvider>>,
    routes: RwLock<HashMap<String, usize>>,
    confirmation: HashMap<String, PendingActionKind>,
}

impl Default for ToolGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolGateway {
    /// Empty gateway with the default confirmation set
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            routes: RwLock::new(HashMap::new()),
            confirmation: DEFAULT_CONFIRMATION_TOOLS
                .iter()
                .map(|(name, kind)| ((*name).to_string(), *kind))
                .collect(),
        }
    }

    /// Register a provider
    pub fn register(&mut self, provider: Arc<dyn ToolProvider>) {
        tracing::debug!(provider = provider.name(), "registered tool provider");
        self.providers.push(provider);
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Gate an additional tool behind confirmation
    #[must_use]
    pub fn with_confirmation(mut self, tool: impl Into<String>, kind: PendingActionKind) -> Self {
        self.confirmation.insert(tool.into(), kind);
        self
    }

    /// Remove a tool from the confirmation set
    #[must_use]
    pub fn without_confirmation(mut self, tool: &str) -> Self {
        self.confirmation.remove(tool);
        self
    }

    pub fn requires_confirmation(&self, tool: &str) -> Option<PendingActionKind> {
        self.confirmation.get(tool).copied()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Initialize every provider, then build the routing table
    pub async fn initialize(&self) -> Result<()> {
        for provider in &self.providers {
            provider.initialize().await.map_err(|e| {
                AgentError::Config(format!("tool provider '{}' failed to initialize: {e}", provider.name()))
            })?;
        }
        let tools = self.catalog().await;
        tracing::info!(providers = self.providers.len(), tools = tools.len(), "tool gateway ready");
        Ok(())
    }

    /// Collect descriptors from all providers and rebuild the name → provider
    /// partition. A name claimed twice stays with the first provider.
    pub async fn catalog(&self) -> Vec<ToolDescriptor> {
        let listed = join_all(self.providers.iter().map(|p| p.list_tools())).await;

        let mut routes: HashMap<String, usize> = HashMap::new();
        let mut catalog = Vec::new();
        for (index, tools) in listed.into_iter().enumerate() {
            for tool in tools {
                if let Some(&owner) = routes.get(&tool.name) {
                    tracing::warn!(
                        tool = %tool.name,
                        owner = self.providers[owner].name(),
                        duplicate = self.providers[index].name(),
                        "tool name claimed by two providers, keeping the first"
                    );
                    continue;
                }
                routes.insert(tool.name.clone(), index);
                catalog.push(tool);
            }
        }

        *self.routes.write().await = routes;
        catalog
    }

    async fn route(&self, tool: &str) -> Option<Arc<dyn ToolProvider>> {
        if self.routes.read().await.is_empty() {
            self.catalog().await;
        }
        let routes = self.routes.read().await;
        routes.get(tool).map(|&i| Arc::clone(&self.providers[i]))
    }

    /// Decide whether a step can run now or must pause for confirmation
    pub fn plan(&self, calls: &[ToolCall]) -> DispatchPlan {
        if !calls.iter().any(|c| self.requires_confirmation(&c.name).is_some()) {
            return DispatchPlan::Immediate;
        }
        DispatchPlan::Confirm(
            calls
                .iter()
                .map(|c| {
                    let kind = self
                        .requires_confirmation(&c.name)
                        .unwrap_or(PendingActionKind::Execute);
                    PendingAction::from_call(c, kind)
                })
                .collect(),
        )
    }

    /// Run one call. Never fails: errors become `is_error` executions.
    pub async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let started = Instant::now();

        let (result_text, is_error) = match self.route(&call.name).await {
            None => (AgentError::ToolNotFound(call.name.clone()).to_string(), true),
            Some(provider) => match provider.call_tool(&call.name, &call.arguments).await {
                Ok(output) => (output.message, output.is_error),
                Err(e) => (e.to_string(), true),
            },
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if is_error {
            tracing::warn!(tool = %call.name, duration_ms, error = %result_text, "tool call failed");
        } else {
            tracing::debug!(tool = %call.name, duration_ms, "tool call succeeded");
        }

        ToolExecution {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result_text,
            is_error,
            duration_ms,
        }
    }

    /// Run calls concurrently; results come back in call order
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolExecution> {
        join_all(calls.iter().map(|c| self.execute(c))).await
    }

    /// Run a previously surfaced action with its stored arguments
    pub async fn execute_confirmed(&self, action: &PendingAction) -> ToolResult {
        tracing::info!(tool = %action.tool_name, action = %action.id, "executing confirmed action");
        self.execute(&action.to_call()).await.to_result()
    }
}
