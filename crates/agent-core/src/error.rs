//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Vendor-level failures abort the turn. Tool-level failures are normally
/// folded into the conversation as error results and only surface here when
/// the consecutive-error circuit breaker trips.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Vendor endpoint answered with a non-2xx status
    #[error("Vendor API error (HTTP {status}): {body}")]
    VendorHttp { status: u16, body: String },

    /// Vendor response was malformed or missing required fields
    #[error("Invalid vendor response: {0}")]
    VendorParse(String),

    /// Provider unreachable (connect failure, timeout)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in any registered provider
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// The same tool error came back twice in a row
    #[error("Tool '{tool}' failed repeatedly with the same error: {error}")]
    CircuitBreaker { tool: String, error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Turn cancelled between steps
    #[error("Turn cancelled")]
    Cancelled,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable by the transport layer
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_) => true,
            Self::VendorHttp { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::VendorHttp { status, .. } if *status == 429 => {
                "The AI service is rate limiting requests. Please wait a moment.".into()
            }
            Self::VendorHttp { status, .. } if *status == 401 || *status == 403 => {
                "Authentication with the AI service failed. Please check your API key.".into()
            }
            Self::VendorHttp { body, .. } => format!("The AI service returned an error: {body}"),
            Self::VendorParse(_) => "The AI service returned a response I could not read.".into(),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::CircuitBreaker { tool, error } => {
                format!("I stopped because '{tool}' kept failing: {error}")
            }
            Self::Cancelled => "The request was cancelled.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
