//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern as an explicit, bounded loop:
//!
//! ```text
//!   ask model ──▶ final answer? ──yes──▶ Completed
//!       ▲              │ no
//!       │              ▼
//!       │        gated call? ──yes──▶ AwaitingConfirmation
//!       │              │ no
//!       │              ▼
//!       └──── execute tools, append results (circuit breaker may abort)
//! ```
//!
//! After `max_steps` iterations one closing call without tools asks the model
//! for a best-effort answer.

use std::fmt::Write;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ProviderAdapter, adapter_for};
use crate::context::ContextManager;
use crate::error::{AgentError, Result};
use crate::gateway::{DispatchPlan, PendingAction, ToolGateway};
use crate::loop_state::{AgentStep, ErrorStreak, ToolExecution};
use crate::message::{ToolCall, ToolResult, UnifiedMessage};
use crate::provider::{LlmProvider, ProviderConfig};
use crate::tool::ToolDescriptor;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools.

Call a tool whenever you need information or want to change something.
After receiving tool results, either call more tools or answer the user.
Be concise and accurate.";

const DEFAULT_CLOSING_PROMPT: &str = "You have run out of tool steps for this request. \
Using only the information gathered so far, give the user your best final answer \
and mention anything you could not finish.";

const EMPTY_ANSWER: &str = "I apologize, but I couldn't generate a response.";

/// How the loop recognizes a final answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationStrategy {
    /// A reply without tool calls is the final answer
    NoToolCalls,
    /// A reply containing the marker is the final answer (marker stripped,
    /// any tool calls ignored). A reply with neither marker nor tool calls
    /// also ends the loop.
    Sentinel(String),
}

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub system_prompt: String,

    /// Maximum model calls per turn, excluding the closing call
    pub max_steps: usize,

    pub termination: TerminationStrategy,

    /// Instruction sent with the closing call when steps run out
    pub closing_prompt: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_steps: 5,
            termination: TerminationStrategy::NoToolCalls,
            closing_prompt: DEFAULT_CLOSING_PROMPT.into(),
        }
    }
}

/// How a turn ended
#[derive(Debug)]
pub enum TurnOutcome {
    Completed,
    /// Paused: nothing in the step ran; the caller must confirm or deny
    AwaitingConfirmation(Vec<PendingAction>),
    MaxStepsReached,
    Cancelled,
    Failed(AgentError),
}

impl TurnOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AwaitingConfirmation(_) => "awaiting_confirmation",
            Self::MaxStepsReached => "max_steps_reached",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of one `process` call
#[derive(Debug)]
pub struct AgentResponse {
    /// Text for the user
    pub message: String,
    /// Audit trail of tool-executing steps
    pub steps: Vec<AgentStep>,
    pub outcome: TurnOutcome,
}

impl AgentResponse {
    pub fn pending_actions(&self) -> &[PendingAction] {
        match &self.outcome {
            TurnOutcome::AwaitingConfirmation(actions) => actions,
            _ => &[],
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Failed(_))
    }
}

/// Progress events. Informational only.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    StepStarted { step: usize },
    ToolCallStarted { step: usize, call: ToolCall },
    ToolCallFinished { step: usize, execution: ToolExecution },
    AwaitingConfirmation { step: usize, actions: Vec<PendingAction> },
    Finished { steps: usize, outcome: &'static str },
}

pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Drives one conversation turn at a time
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    gateway: Arc<ToolGateway>,
    config: OrchestratorConfig,
    on_event: Option<EventCallback>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        gateway: Arc<ToolGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            gateway,
            config,
            on_event: None,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, gateway: Arc<ToolGateway>) -> Self {
        Self::new(provider, gateway, OrchestratorConfig::default())
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn gateway(&self) -> &ToolGateway {
        &self.gateway
    }

    fn emit(&self, event: &AgentEvent) {
        tracing::trace!(?event, "agent event");
        if let Some(callback) = &self.on_event {
            callback(event);
        }
    }

    /// Run one user turn to completion, pause or failure
    pub async fn process(
        &self,
        context: &mut ContextManager,
        message: &str,
        config: ProviderConfig,
    ) -> AgentResponse {
        self.process_with_cancel(context, message, config, CancellationToken::new())
            .await
    }

    /// Like [`Self::process`], checking `cancel` before every step.
    /// The scratchpad only ever receives whole messages.
    pub async fn process_with_cancel(
        &self,
        context: &mut ContextManager,
        message: &str,
        config: ProviderConfig,
        cancel: CancellationToken,
    ) -> AgentResponse {
        let mut steps = Vec::new();
        let result = self
            .run(context, message, &config, &cancel, &mut steps)
            .await;

        let (message, outcome) = match result {
            Ok(done) => done,
            Err(AgentError::Cancelled) => {
                tracing::info!(steps = steps.len(), "turn cancelled");
                (AgentError::Cancelled.user_message(), TurnOutcome::Cancelled)
            }
            Err(e) => {
                tracing::error!(error = %e, steps = steps.len(), "turn aborted");
                (
                    format!("Sorry, I couldn't complete that request. {e}"),
                    TurnOutcome::Failed(e),
                )
            }
        };

        self.emit(&AgentEvent::Finished {
            steps: steps.len(),
            outcome: outcome.label(),
        });

        AgentResponse {
            message,
            steps,
            outcome,
        }
    }

    async fn run(
        &self,
        context: &mut ContextManager,
        message: &str,
        config: &ProviderConfig,
        cancel: &CancellationToken,
        steps: &mut Vec<AgentStep>,
    ) -> Result<(String, TurnOutcome)> {
        context.ensure_system_prompt(&self.config.system_prompt);
        context.add_user_message(message);

        let adapter = adapter_for(config.kind);
        let tools = self.gateway.catalog().await;
        let mut streak = ErrorStreak::default();

        for step in 1..=self.config.max_steps {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            self.emit(&AgentEvent::StepStarted { step });

            let reply = self.call_model(adapter, context.messages(), &tools, config).await?;
            context.add_message(reply.clone());
            let text = reply.text_content();

            if let Some(answer) = self.final_answer(&reply, &text) {
                tracing::debug!(step, "final answer received");
                return Ok((answer, TurnOutcome::Completed));
            }

            let calls: Vec<ToolCall> = reply.tool_calls().into_iter().cloned().collect();

            if let DispatchPlan::Confirm(actions) = self.gateway.plan(&calls) {
                tracing::info!(step, pending = actions.len(), "step paused for confirmation");
                self.emit(&AgentEvent::AwaitingConfirmation {
                    step,
                    actions: actions.clone(),
                });
                return Ok((
                    confirmation_message(&text, &actions),
                    TurnOutcome::AwaitingConfirmation(actions),
                ));
            }

            for call in &calls {
                self.emit(&AgentEvent::ToolCallStarted {
                    step,
                    call: call.clone(),
                });
            }
            let executions = self.gateway.execute_all(&calls).await;
            context.add_tool_results(executions.iter().map(ToolExecution::to_result).collect());

            for execution in &executions {
                self.emit(&AgentEvent::ToolCallFinished {
                    step,
                    execution: execution.clone(),
                });
            }

            let tripped = executions
                .iter()
                .find_map(|e| streak.observe(e).map(|error| (e.tool_name.clone(), error)));

            steps.push(AgentStep {
                step_number: step,
                assistant_text: text,
                tool_executions: executions,
            });

            if let Some((tool, error)) = tripped {
                tracing::warn!(step, tool = %tool, error = %error, "circuit breaker tripped");
                return Err(AgentError::CircuitBreaker { tool, error });
            }
        }

        tracing::warn!(max_steps = self.config.max_steps, "step budget exhausted");
        let closing = self.closing_message(adapter, context, config, steps).await;
        Ok((closing, TurnOutcome::MaxStepsReached))
    }

    async fn call_model(
        &self,
        adapter: &dyn ProviderAdapter,
        messages: &[UnifiedMessage],
        tools: &[ToolDescriptor],
        config: &ProviderConfig,
    ) -> Result<UnifiedMessage> {
        let body = adapter.to_request(messages, tools, config);
        tracing::debug!(
            provider = %config.kind,
            model = %config.model,
            messages = messages.len(),
            tools = tools.len(),
            "calling vendor"
        );
        let response = self.provider.send(adapter.endpoint(), &body, config).await?;
        adapter.from_response(&response)
    }

    fn final_answer(&self, reply: &UnifiedMessage, text: &str) -> Option<String> {
        let answer = match &self.config.termination {
            TerminationStrategy::Sentinel(marker) if text.contains(marker.as_str()) => {
                text.replace(marker.as_str(), "").trim().to_string()
            }
            _ if !reply.has_tool_calls() => text.trim().to_string(),
            _ => return None,
        };
        Some(if answer.is_empty() { EMPTY_ANSWER.into() } else { answer })
    }

    /// One tool-less call for a best-effort answer; falls back to a summary
    /// of the recorded steps when that call fails.
    async fn closing_message(
        &self,
        adapter: &dyn ProviderAdapter,
        context: &mut ContextManager,
        config: &ProviderConfig,
        steps: &[AgentStep],
    ) -> String {
        let mut messages = context.messages().to_vec();
        messages.push(UnifiedMessage::user(&self.config.closing_prompt));

        match self.call_model(adapter, &messages, &[], config).await {
            Ok(reply) => {
                let text = reply.text_content();
                if text.trim().is_empty() {
                    return degraded_summary(steps);
                }
                context.add_message(UnifiedMessage::assistant(text.clone()));
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "closing call failed, summarizing steps");
                degraded_summary(steps)
            }
        }
    }

    /// Run an action the user confirmed. Bypasses the model entirely.
    pub async fn execute_confirmed_action(&self, action: &PendingAction) -> ToolResult {
        self.gateway.execute_confirmed(action).await
    }
}

fn confirmation_message(text: &str, actions: &[PendingAction]) -> String {
    let mut message = String::new();
    if !text.trim().is_empty() {
        message.push_str(text.trim());
        message.push_str("\n\n");
    }
    message.push_str("Please confirm before I continue:");
    for action in actions {
        if action.details.is_empty() {
            let _ = write!(message, "\n- {}", action.title);
        } else {
            let _ = write!(message, "\n- {} ({})", action.title, action.details);
        }
    }
    message
}

fn degraded_summary(steps: &[AgentStep]) -> String {
    let mut summary = format!(
        "I wasn't able to finish this request within {} steps. Here is what I did:",
        steps.len()
    );
    for execution in steps.iter().flat_map(|s| &s.tool_executions) {
        let status = if execution.is_error { "failed" } else { "succeeded" };
        let _ = write!(summary, "\n- {} {status}", execution.tool_name);
    }
    summary
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    gateway: Option<Arc<ToolGateway>>,
    config: OrchestratorConfig,
    on_event: Option<EventCallback>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            gateway: None,
            config: OrchestratorConfig::default(),
            on_event: None,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn gateway(mut self, gateway: Arc<ToolGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    #[must_use]
    pub fn termination(mut self, strategy: TerminationStrategy) -> Self {
        self.config.termination = strategy;
        self
    }

    #[must_use]
    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        if self.config.max_steps == 0 {
            return Err(AgentError::Config("max_steps must be at least 1".into()));
        }
        let gateway = self.gateway.unwrap_or_default();

        Ok(Orchestrator {
            provider,
            gateway,
            config: self.config,
            on_event: self.on_event,
        })
    }
}
