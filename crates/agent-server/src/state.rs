//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use agent_core::{ContextManager, LlmProvider, Orchestrator, PendingAction, ProviderConfig};
use tokio::sync::Mutex;

/// One conversation's scratchpad. The lock serializes turns.
pub type SharedContext = Arc<Mutex<ContextManager>>;

/// A surfaced action waiting for the user's decision
#[derive(Clone, Debug)]
pub struct StoredAction {
    pub conversation_id: String,
    pub action: PendingAction,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Vendor transport, kept for health checks
    pub provider: Arc<dyn LlmProvider>,

    /// Vendor selection and credentials for every turn
    pub provider_config: ProviderConfig,

    pub orchestrator: Arc<Orchestrator>,

    /// Conversation id -> scratchpad
    pub conversations: Arc<Mutex<HashMap<String, SharedContext>>>,

    /// Action id -> pending action
    pub pending: Arc<Mutex<HashMap<String, StoredAction>>>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        provider_config: ProviderConfig,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            provider,
            provider_config,
            orchestrator: Arc::new(orchestrator),
            conversations: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get or create the scratchpad for `id`
    pub async fn conversation(&self, id: &str) -> SharedContext {
        let mut conversations = self.conversations.lock().await;
        Arc::clone(conversations.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(conversation = %id, "new conversation");
            Arc::new(Mutex::new(ContextManager::new()))
        }))
    }

    /// Drop a conversation and any actions still waiting on it.
    /// Returns whether the conversation existed.
    pub async fn remove_conversation(&self, id: &str) -> bool {
        let removed = self.conversations.lock().await.remove(id).is_some();
        let discarded = self.discard_pending(id).await;
        tracing::debug!(conversation = %id, removed, discarded, "conversation removed");
        removed
    }

    /// Forget the actions a conversation left unanswered.
    /// Returns how many were dropped.
    pub async fn discard_pending(&self, conversation_id: &str) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|_, stored| stored.conversation_id != conversation_id);
        before - pending.len()
    }

    pub async fn store_pending(&self, conversation_id: &str, actions: &[PendingAction]) {
        let mut pending = self.pending.lock().await;
        for action in actions {
            pending.insert(
                action.id.clone(),
                StoredAction {
                    conversation_id: conversation_id.to_string(),
                    action: action.clone(),
                },
            );
        }
    }

    /// Remove and return a pending action. A second take of the same id
    /// returns `None`, so each action runs at most once.
    pub async fn take_pending(&self, action_id: &str) -> Option<StoredAction> {
        self.pending.lock().await.remove(action_id)
    }
}
