//! # agent-core
//!
//! Cross-provider agent orchestration: one message model, per-vendor wire
//! adapters, a compressing scratchpad and a confirmation-gated tool gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │   Context    │  │ ToolGateway  │  │  ProviderAdapter    │  │
//! │  │   Manager    │──│ (confirm /   │──│  + LlmProvider      │  │
//! │  │ (compressing)│  │  execute)    │  │  (OpenAI / Claude)  │  │
//! │  └──────────────┘  └──────────────┘  └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scratchpad only ever holds [`UnifiedMessage`]s. Vendor formats exist
//! only at the adapter boundary, so a conversation can switch provider
//! between turns.

pub mod adapter;
pub mod context;
pub mod error;
pub mod gateway;
pub mod loop_state;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod tool;

pub use adapter::{ClaudeAdapter, OpenAiAdapter, ProviderAdapter, adapter_for};
pub use context::ContextManager;
pub use error::{AgentError, Result};
pub use gateway::{DispatchPlan, PendingAction, PendingActionKind, ToolGateway};
pub use loop_state::{AgentStep, ToolExecution};
pub use message::{ContentBlock, Role, ToolCall, ToolResult, UnifiedMessage};
pub use orchestrator::{
    AgentEvent, AgentResponse, EventCallback, Orchestrator, OrchestratorBuilder,
    OrchestratorConfig, TerminationStrategy, TurnOutcome,
};
pub use provider::{LlmProvider, ProviderConfig, ProviderKind};
pub use tool::{ParameterProperty, ParameterSchema, ToolDescriptor, ToolOutput, ToolProvider};
