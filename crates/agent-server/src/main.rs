//! Planner Agent HTTP Server
//!
//! Axum-based server exposing the orchestrator over a small REST API.
//! Destructive tool calls pause the turn; the client confirms or denies
//! them through `/api/actions/{id}/...`.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentEvent, LlmProvider, Orchestrator, ProviderConfig};
use agent_runtime::HttpProvider;
use planner_tools::{CalendarProvider, PLANNER_SYSTEM_PROMPT, RemindersProvider, planner_gateway};

use crate::handlers::{
    chat_handler, confirm_action, delete_conversation, deny_action, health_check, list_tools,
};
use crate::state::AppState;

const DEFAULT_MAX_STEPS: usize = 5;

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/conversations/{id}", delete(delete_conversation))
        .route("/api/actions/{id}/confirm", post(confirm_action))
        .route("/api/actions/{id}/deny", post(deny_action))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider_config = ProviderConfig::from_env()?;
    let provider: Arc<dyn LlmProvider> = Arc::new(HttpProvider::from_env()?);
    tracing::info!(
        provider = %provider_config.kind,
        model = %provider_config.model,
        base_url = provider_config.base_url(),
        "LLM provider configured"
    );

    let gateway = planner_gateway(CalendarProvider::new(), RemindersProvider::new());
    gateway.initialize().await?;

    let max_steps = std::env::var("AGENT_MAX_STEPS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_STEPS);

    let orchestrator = Orchestrator::builder()
        .provider(Arc::clone(&provider))
        .gateway(Arc::new(gateway))
        .system_prompt(PLANNER_SYSTEM_PROMPT)
        .max_steps(max_steps)
        .on_event(Arc::new(|event: &AgentEvent| tracing::debug!(?event, "agent event")))
        .build()?;

    let state = AppState::new(provider, provider_config, orchestrator);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("planner agent listening on http://{addr}");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  GET  /api/tools                 - Tool catalog");
    tracing::info!("  POST /api/chat                  - Send message");
    tracing::info!("  POST /api/actions/{{id}}/confirm  - Run a pending action");
    tracing::info!("  POST /api/actions/{{id}}/deny     - Decline a pending action");
    tracing::info!("  DELETE /api/conversations/{{id}}  - Forget a conversation");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
