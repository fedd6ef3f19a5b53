//! End-to-end turns against scripted vendors and tools

mod common;

use std::sync::Arc;

use agent_core::{
    AgentError, AgentEvent, ContextManager, Orchestrator, PendingActionKind, ProviderConfig,
    ProviderKind, Role, TerminationStrategy, ToolGateway, TurnOutcome,
};
use common::{FakeCalendar, ScriptedProvider, claude_reply, openai_calls, openai_text};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn openai() -> ProviderConfig {
    ProviderConfig::new(ProviderKind::OpenAi, "test-key")
}

fn claude() -> ProviderConfig {
    ProviderConfig::new(ProviderKind::Claude, "test-key")
}

fn setup(
    responses: Vec<Value>,
    calendar: FakeCalendar,
    max_steps: usize,
) -> (Orchestrator, Arc<ScriptedProvider>, Arc<FakeCalendar>) {
    let provider = Arc::new(ScriptedProvider::new(responses));
    let calendar = Arc::new(calendar);
    let gateway = ToolGateway::new().with_provider(calendar.clone());
    let orchestrator = Orchestrator::builder()
        .provider(provider.clone())
        .gateway(Arc::new(gateway))
        .system_prompt("You are a planner.")
        .max_steps(max_steps)
        .build()
        .unwrap();
    (orchestrator, provider, calendar)
}

fn wire_messages(request: &Value) -> Vec<Value> {
    request["messages"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_single_tool_call_then_answer() {
    let (orch, provider, calendar) = setup(
        vec![
            openai_calls(&[("call_1", "list_events", json!({"date": "2026-10-19"}))]),
            openai_text("Tomorrow you have Standup at 9:00 and the Dentist at 14:00."),
        ],
        FakeCalendar::default(),
        5,
    );
    let mut context = ContextManager::new();

    let response = orch
        .process(&mut context, "What's on my calendar tomorrow?", openai())
        .await;

    assert!(matches!(response.outcome, TurnOutcome::Completed));
    assert!(response.message.contains("Dentist"));
    assert_eq!(response.steps.len(), 1);
    assert_eq!(response.steps[0].tool_executions.len(), 1);
    assert_eq!(calendar.call_names(), vec!["list_events"]);
    assert_eq!(provider.request_count(), 2);

    // The follow-up request carries the tool result keyed to the call
    let follow_up = wire_messages(&provider.request(1));
    let last = follow_up.last().unwrap();
    assert_eq!(last["role"], "tool");
    assert_eq!(last["tool_call_id"], "call_1");
    assert!(last["content"].as_str().unwrap().contains("Standup"));
    assert!(provider.request(1)["tools"].is_array());
}

#[tokio::test]
async fn test_destructive_call_waits_for_confirmation() {
    let (orch, provider, calendar) = setup(
        vec![openai_calls(&[("call_del", "delete_event", json!({"title": "Dentist"}))])],
        FakeCalendar::default(),
        5,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Cancel my dentist appointment", openai()).await;

    let TurnOutcome::AwaitingConfirmation(actions) = &response.outcome else {
        panic!("expected pause, got {:?}", response.outcome);
    };
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, PendingActionKind::Delete);
    assert_eq!(actions[0].tool_name, "delete_event");
    assert!(calendar.call_names().is_empty());
    assert_eq!(provider.request_count(), 1);
    assert!(response.message.contains("Delete event \"Dentist\""));

    let result = orch.execute_confirmed_action(&actions[0]).await;
    assert!(!result.is_error);
    assert_eq!(result.tool_call_id, "call_del");
    assert_eq!(result.content, "Deleted event 'Dentist'");
    assert_eq!(calendar.call_names(), vec!["delete_event"]);
}

#[tokio::test]
async fn test_mixed_step_is_gated_as_a_whole() {
    let (orch, _provider, calendar) = setup(
        vec![openai_calls(&[
            ("c1", "list_events", json!({})),
            ("c2", "delete_event", json!({"title": "Standup"})),
        ])],
        FakeCalendar::default(),
        5,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Clear my morning", openai()).await;

    let kinds: Vec<PendingActionKind> = response.pending_actions().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![PendingActionKind::Execute, PendingActionKind::Delete]);
    assert!(calendar.call_names().is_empty());
}

#[tokio::test]
async fn test_repeated_identical_failure_trips_breaker() {
    let (orch, provider, _calendar) = setup(
        vec![
            openai_calls(&[("c1", "create_event", json!({"title": "Review"}))]),
            openai_calls(&[("c2", "create_event", json!({"title": "Review"}))]),
            openai_text("never reached"),
        ],
        FakeCalendar::failing("Permission denied"),
        5,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Book a review", openai()).await;

    match &response.outcome {
        TurnOutcome::Failed(AgentError::CircuitBreaker { tool, error }) => {
            assert_eq!(tool, "create_event");
            assert_eq!(error, "Permission denied");
        }
        other => panic!("expected circuit breaker, got {other:?}"),
    }
    assert_eq!(response.steps.len(), 2);
    assert!(response.message.contains("Permission denied"));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_plain_answer_ends_in_one_call() {
    let (orch, provider, calendar) = setup(vec![openai_text("Hello!")], FakeCalendar::default(), 5);
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "hi", openai()).await;

    assert!(matches!(response.outcome, TurnOutcome::Completed));
    assert_eq!(response.message, "Hello!");
    assert!(response.steps.is_empty());
    assert_eq!(provider.request_count(), 1);
    assert!(calendar.call_names().is_empty());
    // system, user, assistant
    assert_eq!(context.len(), 3);
    assert_eq!(context.messages()[0].role, Role::System);
}

#[tokio::test]
async fn test_step_budget_then_closing_call() {
    let looping = |id: &str| openai_calls(&[(id, "list_events", json!({}))]);
    let (orch, provider, _calendar) = setup(
        vec![
            looping("c1"),
            looping("c2"),
            looping("c3"),
            openai_text("Here is what I found so far."),
        ],
        FakeCalendar::default(),
        3,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Keep looking", openai()).await;

    assert!(matches!(response.outcome, TurnOutcome::MaxStepsReached));
    assert_eq!(response.message, "Here is what I found so far.");
    assert_eq!(response.steps.len(), 3);
    assert_eq!(provider.request_count(), 4);

    let closing = provider.request(3);
    assert!(closing.get("tools").is_none());
    assert_eq!(wire_messages(&closing).last().unwrap()["role"], "user");
}

#[tokio::test]
async fn test_failed_closing_call_falls_back_to_summary() {
    let (orch, provider, _calendar) = setup(
        vec![
            openai_calls(&[("c1", "list_events", json!({}))]),
            openai_calls(&[("c2", "create_event", json!({"title": "x"}))]),
        ],
        FakeCalendar::default(),
        2,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Do things", openai()).await;

    assert!(matches!(response.outcome, TurnOutcome::MaxStepsReached));
    assert!(response.message.contains("wasn't able to finish"));
    assert!(response.message.contains("- list_events succeeded"));
    assert!(response.message.contains("- create_event succeeded"));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_parallel_calls_keep_order() {
    let (orch, provider, _calendar) = setup(
        vec![
            openai_calls(&[
                ("a", "list_events", json!({})),
                ("b", "create_event", json!({"title": "Gym"})),
                ("c", "missing_tool", json!({})),
            ]),
            openai_text("Done."),
        ],
        FakeCalendar::default(),
        5,
    );
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Do three things", openai()).await;

    let ids: Vec<&str> = response.steps[0]
        .tool_executions
        .iter()
        .map(|e| e.tool_call_id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(response.steps[0].tool_executions[2].is_error);
    assert_eq!(response.steps[0].tool_executions[2].result_text, "Tool not found: missing_tool");

    let follow_up = wire_messages(&provider.request(1));
    let tool_ids: Vec<&str> = follow_up
        .iter()
        .filter(|m| m["role"] == "tool")
        .filter_map(|m| m["tool_call_id"].as_str())
        .collect();
    assert_eq!(tool_ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_long_turn_compresses_tool_history() {
    let mut responses: Vec<Value> = (1..=5)
        .map(|n| openai_calls(&[(format!("c{n}").as_str(), "list_events", json!({}))]))
        .collect();
    responses.push(openai_text("All checked."));
    let (orch, provider, _calendar) = setup(responses, FakeCalendar::default(), 6);
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Check every day this week", openai()).await;

    assert!(matches!(response.outcome, TurnOutcome::Completed));
    assert_eq!(context.tool_message_count(), 3);
    assert!(context.tool_message_count() < context.max_tool_messages());
    assert!(!context.compress());

    let summaries: Vec<_> = context
        .messages()
        .iter()
        .filter(|m| m.metadata.get("compressed").is_some())
        .collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].role, Role::Assistant);

    // Calls whose results were folded are no longer sent to the vendor
    let last_request = wire_messages(&provider.request(5));
    let sent_ids: Vec<&str> = last_request
        .iter()
        .filter_map(|m| m["tool_calls"].as_array())
        .flatten()
        .filter_map(|c| c["id"].as_str())
        .collect();
    assert_eq!(sent_ids, vec!["c3", "c4", "c5"]);
}

#[tokio::test]
async fn test_switching_vendor_between_turns() {
    let (orch, provider, _calendar) = setup(
        vec![
            openai_calls(&[("call_1", "list_events", json!({}))]),
            openai_text("Two events."),
            claude_reply(Some("The dentist is at 14:00."), &[]),
        ],
        FakeCalendar::default(),
        5,
    );
    let mut context = ContextManager::new();

    orch.process(&mut context, "What's on today?", openai()).await;
    let response = orch.process(&mut context, "When is the dentist?", claude()).await;

    assert!(matches!(response.outcome, TurnOutcome::Completed));
    let request = provider.request(2);
    assert_eq!(request["system"], "You are a planner.");

    let messages = wire_messages(&request);
    let roles: Vec<&str> = messages.iter().filter_map(|m| m["role"].as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant", "user"]);
    assert_eq!(messages[1]["content"][0]["type"], "tool_use");
    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "call_1");
}

#[tokio::test]
async fn test_claude_sentinel_termination() {
    let provider = Arc::new(ScriptedProvider::new(vec![claude_reply(
        Some("DONE: You're free all afternoon."),
        &[("toolu_1", "list_events", json!({}))],
    )]));
    let calendar = Arc::new(FakeCalendar::default());
    let orch = Orchestrator::builder()
        .provider(provider.clone())
        .gateway(Arc::new(ToolGateway::new().with_provider(calendar.clone())))
        .termination(TerminationStrategy::Sentinel("DONE:".into()))
        .build()
        .unwrap();
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "Am I free?", claude()).await;

    assert!(matches!(response.outcome, TurnOutcome::Completed));
    assert_eq!(response.message, "You're free all afternoon.");
    assert!(calendar.call_names().is_empty());
}

#[tokio::test]
async fn test_cancel_between_steps_keeps_scratchpad_whole() {
    let (orch, provider, _calendar) = setup(
        vec![
            openai_calls(&[("c1", "list_events", json!({}))]),
            openai_text("unreachable"),
        ],
        FakeCalendar::default(),
        5,
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let orch = orch.with_event_callback(Arc::new(move |event: &AgentEvent| {
        if matches!(event, AgentEvent::ToolCallFinished { .. }) {
            trigger.cancel();
        }
    }));
    let mut context = ContextManager::new();

    let response = orch
        .process_with_cancel(&mut context, "Look it up", openai(), cancel)
        .await;

    assert!(matches!(response.outcome, TurnOutcome::Cancelled));
    assert_eq!(response.steps.len(), 1);
    assert_eq!(provider.request_count(), 1);
    assert_eq!(context.last().map(|m| m.role), Some(Role::Tool));
}

#[tokio::test]
async fn test_vendor_error_is_reported() {
    let provider = Arc::new(ScriptedProvider::default());
    provider.push_error(AgentError::VendorHttp {
        status: 401,
        body: "invalid x-api-key".into(),
    });
    let orch = Orchestrator::with_defaults(provider, Arc::new(ToolGateway::new()));
    let mut context = ContextManager::new();

    let response = orch.process(&mut context, "hi", claude()).await;

    assert!(matches!(
        response.outcome,
        TurnOutcome::Failed(AgentError::VendorHttp { status: 401, .. })
    ));
    assert!(response.message.contains("invalid x-api-key"));
}
