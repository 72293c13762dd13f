//! Hivemind - swarm orchestration engine.
//!
//! Dispatches a task (or a batch of tasks) across a named set of
//! sub-agents with:
//! - parallel (bounded concurrency) and sequential dispatch strategies
//! - per-attempt timeouts layered beneath a bounded retry budget
//! - fail-fast cancellation of scheduled and in-flight work
//! - per-sub-agent context isolation via deep-copied state
//! - deterministic, target-ordered result aggregation
//! - an operations log appended to the caller's context state
//!
//! The orchestrator itself satisfies the sub-agent contract, so swarms
//! compose: an orchestrator can be registered as a sub-agent of another.

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{SwarmError, SwarmResult};
pub use domain::models::{
    AgentContext, MassSwarmOptions, MassSwarmReport, SubAgentResult, SwarmConfig, SwarmOptions,
    SwarmReport, SwarmStrategy,
};
pub use domain::ports::{NullEventSink, SubAgent, SwarmEventSink, TracingEventSink};
pub use services::SwarmOrchestrator;
