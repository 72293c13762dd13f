//! Domain models: execution contexts, configuration, strategies, and
//! report schemas.

pub mod config;
pub mod context;
pub mod report;
pub mod strategy;

pub use config::{MassSwarmOptions, SwarmConfig, SwarmOptions};
pub use context::{
    AgentContext, METADATA_SUB_AGENT, METADATA_SWARM_PARENT, SWARM_HISTORY_KEY,
};
pub use report::{
    MassSwarmReport, SubAgentResult, SwarmHistoryEntry, SwarmHistoryKind, SwarmReport,
    CANCELLED_FAIL_FAST, SKIP_FAIL_FAST, TIMEOUT_ERROR_PREFIX,
};
pub use strategy::SwarmStrategy;
