//! HTTP LLM Provider
//!
//! Implementation of `LlmProvider` that POSTs adapter-built bodies to the
//! vendor's REST API. Auth headers depend on the vendor; the body shape is
//! already decided by the adapter. No retries.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    provider::{LlmProvider, ProviderConfig, ProviderKind},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Claude API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Self {
            timeout_secs,
            ..Default::default()
        }
    }
}

/// reqwest-backed vendor transport
pub struct HttpProvider {
    client: Client,
    config: HttpConfig,
}

impl HttpProvider {
    pub fn new() -> Result<Self> {
        Self::from_config(HttpConfig::default())
    }

    pub fn from_config(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(HttpConfig::from_env())
    }

    pub const fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn authorize(request: RequestBuilder, config: &ProviderConfig) -> RequestBuilder {
        match config.kind {
            ProviderKind::OpenAi => request.bearer_auth(&config.api_key),
            ProviderKind::Claude => request
                .header("x-api-key", &config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
        }
    }
}

/// Map transport failures onto the agent error taxonomy
fn transport_error(e: &reqwest::Error) -> AgentError {
    if e.is_connect() || e.is_timeout() {
        AgentError::ProviderUnavailable(e.to_string())
    } else {
        AgentError::Other(format!("HTTP request failed: {e}"))
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, endpoint: &str, body: &Value, config: &ProviderConfig) -> Result<Value> {
        let url = format!("{}{endpoint}", config.base_url());
        tracing::debug!(provider = %config.kind, url = %url, "POST vendor request");

        let request = Self::authorize(self.client.post(&url), config).json(body);
        let response = request.send().await.map_err(|e| transport_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            tracing::warn!(provider = %config.kind, status = status.as_u16(), "vendor returned error");
            return Err(AgentError::VendorHttp {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            AgentError::VendorParse(format!("{} response is not JSON: {e}", config.kind))
        })
    }

    async fn health_check(&self, config: &ProviderConfig) -> Result<bool> {
        if config.api_key.is_empty() {
            tracing::warn!(provider = %config.kind, "no API key configured");
            return Ok(false);
        }
        Ok(true)
    }
}
