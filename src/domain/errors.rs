//! Domain errors for the hivemind swarm engine.

use thiserror::Error;

/// Errors raised synchronously from the public API, before any sub-agent
/// execution starts.
///
/// Sub-agent failures, timeouts, and cancellations never surface here;
/// they are classified into [`SubAgentResult`](crate::domain::models::SubAgentResult)
/// records inside the swarm report.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Sub-agent name conflicts with orchestrator name: {0}")]
    NamingConflict(String),

    #[error("Unknown sub-agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type SwarmResult<T> = Result<T, SwarmError>;
