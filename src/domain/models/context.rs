//! Execution context handed to sub-agents, with optional state isolation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Metadata key naming the orchestrator that derived a sub-context.
pub const METADATA_SWARM_PARENT: &str = "swarm_parent";

/// Metadata key naming the sub-agent a derived context was built for.
pub const METADATA_SUB_AGENT: &str = "sub_agent";

/// State key under which swarm operation history accumulates.
pub const SWARM_HISTORY_KEY: &str = "swarm_history";

/// Per-invocation execution context.
///
/// Owned by the caller. The orchestrator never mutates `metadata` and only
/// writes `state["swarm_history"]` at the top level, after all sub-agent
/// work for that invocation has finished.
///
/// `Clone` aliases the underlying state map; that shared view is exactly
/// what sub-agents receive when context isolation is off. With isolation
/// on (the default) each dispatch gets a fresh context from
/// [`AgentContext::derive_sub_context`] whose state is a deep copy, so
/// sub-agent writes stay local to the invocation.
///
/// State values are JSON values, so the deep copy is a plain `clone` and
/// can never fail on an uncopyable value.
#[derive(Debug, Clone)]
pub struct AgentContext {
    session_id: String,
    user_id: Option<String>,
    metadata: HashMap<String, Value>,
    state: Arc<RwLock<Map<String, Value>>>,
}

impl AgentContext {
    /// Create an empty context for a session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
            metadata: HashMap::new(),
            state: Arc::new(RwLock::new(Map::new())),
        }
    }

    /// Attach a user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Seed the mutable state map, replacing any prior contents.
    #[must_use]
    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.state = Arc::new(RwLock::new(state));
        self
    }

    /// The caller-assigned session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The optional user id.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Read-only view of the metadata map.
    pub const fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Read one state value (cloned out of the lock).
    pub async fn state_get(&self, key: &str) -> Option<Value> {
        self.state.read().await.get(key).cloned()
    }

    /// Write one state value.
    pub async fn state_set(&self, key: impl Into<String>, value: Value) {
        self.state.write().await.insert(key.into(), value);
    }

    /// Deep copy of the full state map.
    pub async fn state_snapshot(&self) -> Map<String, Value> {
        self.state.read().await.clone()
    }

    /// Entries accumulated under `swarm_history`, oldest first.
    pub async fn swarm_history(&self) -> Vec<Value> {
        match self.state.read().await.get(SWARM_HISTORY_KEY) {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        }
    }

    /// Append one operation record to `state["swarm_history"]`, creating
    /// the array if absent. A non-array value under the key is replaced.
    pub(crate) async fn push_swarm_history(&self, entry: Value) {
        let mut state = self.state.write().await;
        match state.get_mut(SWARM_HISTORY_KEY) {
            Some(Value::Array(entries)) => entries.push(entry),
            _ => {
                state.insert(SWARM_HISTORY_KEY.to_string(), Value::Array(vec![entry]));
            }
        }
    }

    /// Derive the isolated context handed to one sub-agent invocation.
    ///
    /// Same session and user; metadata is shallow-copied with the
    /// `swarm_parent` and `sub_agent` keys added; state is deep-copied
    /// into a fresh lock with no aliasing back to the parent.
    pub async fn derive_sub_context(&self, orchestrator: &str, sub_agent: &str) -> Self {
        let state = self.state.read().await.clone();
        let mut metadata = self.metadata.clone();
        metadata.insert(
            METADATA_SWARM_PARENT.to_string(),
            Value::String(orchestrator.to_string()),
        );
        metadata.insert(
            METADATA_SUB_AGENT.to_string(),
            Value::String(sub_agent.to_string()),
        );
        Self {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            metadata,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// True when two contexts alias the same underlying state map.
    pub fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn clone_aliases_state() {
        let parent = AgentContext::new("session");
        let shared = parent.clone();
        shared.state_set("key", json!(1)).await;

        assert!(parent.shares_state_with(&shared));
        assert_eq!(parent.state_get("key").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn derived_sub_context_deep_copies_state() {
        let parent = AgentContext::new("session").with_user_id("user-1");
        parent
            .state_set("nested", json!({"inner": [1, 2, 3]}))
            .await;

        let sub = parent.derive_sub_context("overseer", "worker").await;
        assert!(!parent.shares_state_with(&sub));

        sub.state_set("nested", json!({"inner": [9]})).await;
        sub.state_set("extra", json!(true)).await;

        // Parent state is untouched by sub-context mutations.
        assert_eq!(
            parent.state_get("nested").await,
            Some(json!({"inner": [1, 2, 3]}))
        );
        assert_eq!(parent.state_get("extra").await, None);
        assert_eq!(sub.session_id(), "session");
        assert_eq!(sub.user_id(), Some("user-1"));
    }

    #[tokio::test]
    async fn derived_sub_context_stamps_metadata() {
        let parent = AgentContext::new("session").with_metadata("origin", json!("caller"));
        let sub = parent.derive_sub_context("overseer", "worker").await;

        assert_eq!(sub.metadata().get("origin"), Some(&json!("caller")));
        assert_eq!(
            sub.metadata().get(METADATA_SWARM_PARENT),
            Some(&json!("overseer"))
        );
        assert_eq!(sub.metadata().get(METADATA_SUB_AGENT), Some(&json!("worker")));
        // The parent's own metadata gains nothing.
        assert!(!parent.metadata().contains_key(METADATA_SWARM_PARENT));
    }

    #[tokio::test]
    async fn history_append_creates_and_grows_the_array() {
        let context = AgentContext::new("session");
        assert!(context.swarm_history().await.is_empty());

        context.push_swarm_history(json!({"operation_id": "a"})).await;
        context.push_swarm_history(json!({"operation_id": "b"})).await;

        let history = context.swarm_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["operation_id"], json!("a"));
        assert_eq!(history[1]["operation_id"], json!("b"));
    }
}
