//! Sub-agent port - the capability the orchestrator dispatches to.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::AgentContext;

/// An executable capability the orchestrator can dispatch a task to.
///
/// Implementations only need a stable, non-empty name and an async
/// `execute`. Output is any JSON value; failure is signaled by returning
/// an error, whose display string ends up in the per-agent result record.
///
/// The orchestrator itself implements this trait by delegating to a swarm
/// with default settings, so orchestrators compose as sub-agents of other
/// orchestrators.
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Stable name, unique within one orchestrator.
    fn name(&self) -> &str;

    /// Run one task under the given context.
    async fn execute(&self, task: &str, context: &AgentContext) -> Result<Value>;
}

impl fmt::Debug for dyn SubAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubAgent").field("name", &self.name()).finish()
    }
}
