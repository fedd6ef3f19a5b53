//! # agent-runtime
//!
//! Runtime transport for the agent orchestrator.
//!
//! ## Providers
//!
//! - **HTTP** (default): OpenAI `/chat/completions` and Claude `/messages`
//!   over reqwest. The wire body is built by `agent-core`'s adapters; this
//!   crate only adds the URL, auth headers and status handling.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::HttpProvider;
//!
//! let provider = HttpProvider::from_env()?;
//! let orchestrator = Orchestrator::builder()
//!     .provider(Arc::new(provider))
//!     .gateway(Arc::new(gateway))
//!     .build()?;
//! ```

pub mod http;

pub use http::{HttpConfig, HttpProvider};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, ContextManager, LlmProvider, Orchestrator, ProviderConfig, ProviderKind, Result,
    ToolGateway,
};
