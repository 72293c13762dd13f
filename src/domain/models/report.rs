//! Per-agent result records, aggregated swarm reports, and the compact
//! history entries appended to the caller's context state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::models::strategy::SwarmStrategy;

/// Skip marker recorded for sequential targets behind a fail-fast stop.
pub const SKIP_FAIL_FAST: &str = "Skipped due to fail_fast policy";

/// Cancellation marker recorded for parallel units stopped by fail-fast.
pub const CANCELLED_FAIL_FAST: &str = "Cancelled by fail_fast";

/// Prefix of every timeout error message; the suffix is the configured
/// per-attempt timeout in seconds.
pub const TIMEOUT_ERROR_PREFIX: &str = "Timed out after ";

/// Outcome of running one sub-agent, covering all retry attempts.
///
/// Serializes with exactly these seven fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAgentResult {
    /// Registered name of the sub-agent.
    pub agent: String,
    /// True iff the final attempt returned without error or timeout.
    pub success: bool,
    /// Output of the successful attempt; absent on failure.
    pub output: Option<Value>,
    /// Error message from the final attempt; absent on success.
    pub error: Option<String>,
    /// Attempts actually executed. Zero means the unit never started.
    pub attempts: u32,
    /// True iff the final attempt ended on the per-attempt timeout.
    pub timed_out: bool,
    /// Wall time spent on this sub-agent, in milliseconds.
    pub duration_ms: f64,
}

impl SubAgentResult {
    /// Record for a unit that never started (fail-fast skip or
    /// cancellation of a not-yet-scheduled unit).
    pub(crate) fn skipped(agent: impl Into<String>, marker: &str) -> Self {
        Self {
            agent: agent.into(),
            success: false,
            output: None,
            error: Some(marker.to_string()),
            attempts: 0,
            timed_out: false,
            duration_ms: 0.0,
        }
    }
}

/// Aggregated report for one swarm operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmReport {
    /// True iff every attempted sub-agent succeeded.
    pub success: bool,
    /// Strategy the swarm ran with.
    pub strategy: SwarmStrategy,
    pub total_agents: usize,
    pub successful_agents: usize,
    pub failed_agents: usize,
    /// Per-agent results in original target order, regardless of
    /// completion order.
    pub results: Vec<SubAgentResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: f64,
    /// Unique id of this operation.
    pub operation_id: String,
    /// Trace id; equals the mass-swarm correlation id for inner swarms.
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Aggregated report for one mass-swarm operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSwarmReport {
    /// True iff every per-task swarm succeeded.
    pub success: bool,
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    /// One swarm report per input task, in input order.
    pub operations: Vec<SwarmReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub operation_id: String,
    pub correlation_id: String,
}

/// Operation kind recorded in `swarm_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmHistoryKind {
    Swarm,
    MassSwarm,
}

/// Compact operation record appended to `context.state["swarm_history"]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmHistoryEntry {
    pub operation_id: String,
    pub kind: SwarmHistoryKind,
    /// The common task; swarm entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// The input tasks; mass-swarm entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<String>>,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    /// Successful sub-agents (swarm) or tasks (mass swarm).
    pub successful: usize,
    pub failed: usize,
}
