//! LLM Provider Strategy Pattern
//!
//! The orchestrator never speaks HTTP itself. It hands a vendor-shaped request
//! body (built by a [`crate::adapter::ProviderAdapter`]) to an [`LlmProvider`]
//! and gets the raw vendor JSON back.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{LlmProvider, ProviderConfig};
//!
//! let config = ProviderConfig::from_env()?;
//! let reply = provider.send("/messages", &body, &config).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Which vendor wire protocol to speak
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-shaped chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Claude-shaped messages
    Claude,
}

impl ProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Claude => "claude",
        }
    }

    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Claude => "https://api.anthropic.com/v1",
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Claude => "claude-3-5-sonnet-latest",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" | "gpt" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            other => Err(AgentError::Config(format!("unknown provider '{other}'"))),
        }
    }
}

/// Per-call vendor configuration. Passed by value into every turn.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Model identifier (e.g., "gpt-4o", "claude-3-5-sonnet-latest")
    pub model: String,

    #[serde(skip)]
    pub api_key: String,

    /// Override for proxies / compatible endpoints
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

const fn default_max_tokens() -> u32 { 1024 }
const fn default_temperature() -> f32 { 0.7 }

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            model: kind.default_model().into(),
            api_key: api_key.into(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }

    /// Load from `LLM_*` environment variables
    pub fn from_env() -> Result<Self> {
        let kind: ProviderKind = std::env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "openai".into())
            .parse()?;

        let vendor_key = match kind {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        };
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var(vendor_key))
            .map_err(|_| AgentError::Config(format!("set LLM_API_KEY or {vendor_key}")))?;

        let mut config = Self::new(kind, api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        config.base_url = std::env::var("LLM_BASE_URL").ok();
        if let Some(max_tokens) = std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()) {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()) {
            config.temperature = temperature;
        }
        Ok(config)
    }
}

/// Strategy trait for vendor transports
///
/// Implementations POST `body` to `config.base_url() + endpoint` and return
/// the decoded JSON. Non-2xx statuses must map to [`AgentError::VendorHttp`].
/// No retries: retry policy belongs to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Send one request and return the raw vendor response
    async fn send(&self, endpoint: &str, body: &Value, config: &ProviderConfig) -> Result<Value>;

    /// Check if the provider is configured correctly
    async fn health_check(&self, config: &ProviderConfig) -> Result<bool> {
        Ok(!config.api_key.is_empty())
    }
}
