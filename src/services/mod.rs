//! Engine services: registry, per-agent runner, dispatch strategies, and
//! the orchestrator.

pub mod agent_registry;
pub(crate) mod agent_runner;
pub(crate) mod dispatch;
pub mod swarm_orchestrator;

pub use agent_registry::AgentRegistry;
pub use swarm_orchestrator::SwarmOrchestrator;
