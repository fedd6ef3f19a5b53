//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agent_core::{AgentStep, PendingAction, ToolDescriptor, ToolResult, TurnOutcome};

use crate::state::AppState;

/// Result text recorded when the user turns an action down
pub const DECLINED: &str = "User declined this action";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub model: String,
    pub provider_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub conversation_id: String,
    pub outcome: &'static str,
    pub steps: Vec<AgentStep>,
    pub pending_actions: Vec<PendingAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action_id: String,
    pub conversation_id: String,
    pub result: ToolResult,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("No pending action with id '{0}'")]
    ActionNotFound(String),

    #[error("No conversation with id '{0}'")]
    ConversationNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::EmptyMessage => (StatusCode::BAD_REQUEST, "EMPTY_MESSAGE"),
            Self::ActionNotFound(_) => (StatusCode::NOT_FOUND, "ACTION_NOT_FOUND"),
            Self::ConversationNotFound(_) => (StatusCode::NOT_FOUND, "CONVERSATION_NOT_FOUND"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.into(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_configured = state
        .provider
        .health_check(&state.provider_config)
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider_config.kind.to_string(),
        model: state.provider_config.model.clone(),
        provider_configured,
    })
}

/// Tool catalog as sent to the model
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.orchestrator.gateway().catalog().await)
}

/// Run one user turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let conversation_id = payload
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // A new turn supersedes whatever the previous one left for confirmation
    let discarded = state.discard_pending(&conversation_id).await;
    if discarded > 0 {
        tracing::info!(conversation = %conversation_id, discarded, "dropped unanswered actions");
    }

    let context = state.conversation(&conversation_id).await;
    let response = {
        let mut context = context.lock().await;
        state
            .orchestrator
            .process(&mut context, &payload.message, state.provider_config.clone())
            .await
    };

    let pending_actions = response.pending_actions().to_vec();
    state.store_pending(&conversation_id, &pending_actions).await;

    let error = match &response.outcome {
        TurnOutcome::Failed(e) => {
            tracing::error!(conversation = %conversation_id, error = %e, "turn failed");
            Some(e.user_message())
        }
        _ => None,
    };

    tracing::info!(
        conversation = %conversation_id,
        outcome = response.outcome.label(),
        steps = response.steps.len(),
        "turn finished"
    );

    Ok(Json(ChatResponse {
        message: response.message,
        conversation_id,
        outcome: response.outcome.label(),
        steps: response.steps,
        pending_actions,
        error,
    }))
}

/// Execute a pending action the user approved
pub async fn confirm_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let stored = state
        .take_pending(&action_id)
        .await
        .ok_or_else(|| ApiError::ActionNotFound(action_id.clone()))?;

    let result = state.orchestrator.execute_confirmed_action(&stored.action).await;
    record_result(&state, &stored.conversation_id, result.clone()).await;

    Ok(Json(ActionResponse {
        action_id,
        conversation_id: stored.conversation_id,
        result,
    }))
}

/// Drop a pending action without running it
pub async fn deny_action(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let stored = state
        .take_pending(&action_id)
        .await
        .ok_or_else(|| ApiError::ActionNotFound(action_id.clone()))?;

    tracing::info!(action = %action_id, tool = %stored.action.tool_name, "action declined");
    let result = ToolResult::failure(stored.action.tool_call_id.clone(), DECLINED);
    record_result(&state, &stored.conversation_id, result.clone()).await;

    Ok(Json(ActionResponse {
        action_id,
        conversation_id: stored.conversation_id,
        result,
    }))
}

/// Forget a conversation and its pending actions
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.remove_conversation(&conversation_id).await {
        tracing::info!(conversation = %conversation_id, "conversation deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ConversationNotFound(conversation_id))
    }
}

/// Close the paused call in the conversation's scratchpad
async fn record_result(state: &AppState, conversation_id: &str, result: ToolResult) {
    let context = state.conversation(conversation_id).await;
    context.lock().await.add_tool_results(vec![result]);
}
