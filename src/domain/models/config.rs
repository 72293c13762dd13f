//! Swarm engine configuration and per-call overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::models::strategy::SwarmStrategy;

/// Construction-time defaults for a swarm orchestrator.
///
/// Every field can be overridden per call through [`SwarmOptions`] or
/// [`MassSwarmOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SwarmConfig {
    /// Default dispatch strategy.
    #[serde(default)]
    pub strategy: SwarmStrategy,

    /// Cap on concurrently executing sub-agents within one swarm.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-attempt timeout in seconds. Absent or non-positive disables it.
    #[serde(default = "default_sub_agent_timeout")]
    pub sub_agent_timeout: Option<f64>,

    /// Additional attempts after the first, per sub-agent.
    #[serde(default)]
    pub sub_agent_retries: u32,

    /// Stop dispatching and cancel outstanding work on the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Hand each sub-agent an isolated deep copy of the context state.
    #[serde(default = "default_isolate_context")]
    pub isolate_context: bool,

    /// Cap on concurrently running swarms inside a mass swarm.
    #[serde(default = "default_max_task_concurrency")]
    pub max_task_concurrency: usize,
}

const fn default_max_concurrency() -> usize {
    8
}

const fn default_sub_agent_timeout() -> Option<f64> {
    Some(30.0)
}

const fn default_isolate_context() -> bool {
    true
}

const fn default_max_task_concurrency() -> usize {
    4
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            strategy: SwarmStrategy::default(),
            max_concurrency: default_max_concurrency(),
            sub_agent_timeout: default_sub_agent_timeout(),
            sub_agent_retries: 0,
            fail_fast: false,
            isolate_context: default_isolate_context(),
            max_task_concurrency: default_max_task_concurrency(),
        }
    }
}

impl SwarmConfig {
    /// Validate the invariants the engine relies on.
    pub fn validate(&self) -> SwarmResult<()> {
        if self.max_concurrency == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "max_concurrency must be a positive integer".to_string(),
            ));
        }
        if self.max_task_concurrency == 0 {
            return Err(SwarmError::InvalidConfiguration(
                "max_task_concurrency must be a positive integer".to_string(),
            ));
        }
        if let Some(timeout) = self.sub_agent_timeout {
            if !timeout.is_finite() {
                return Err(SwarmError::InvalidConfiguration(format!(
                    "sub_agent_timeout must be a finite number of seconds, got {timeout}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-call overrides for one `execute_swarm` invocation.
///
/// Every field defaults to "use the orchestrator's configured value".
#[derive(Debug, Clone, Default)]
pub struct SwarmOptions {
    /// Restrict the fan-out to these agents, in this order.
    pub target_agents: Option<Vec<String>>,
    /// Per-agent task overrides replacing the common task.
    pub sub_tasks: HashMap<String, String>,
    /// Dispatch strategy override.
    pub strategy: Option<SwarmStrategy>,
    /// Concurrency cap override, clamped to at least 1.
    pub max_concurrency: Option<usize>,
    /// Per-attempt timeout override in seconds; non-positive disables it.
    pub timeout: Option<f64>,
    /// Retry budget override.
    pub retries: Option<u32>,
    /// Fail-fast override.
    pub fail_fast: Option<bool>,
    /// Context isolation override.
    pub isolate_context: Option<bool>,
}

impl SwarmOptions {
    /// Restrict the fan-out to the named agents, in the given order.
    #[must_use]
    pub fn with_targets<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_agents = Some(agents.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the common task for one agent.
    #[must_use]
    pub fn with_sub_task(mut self, agent: impl Into<String>, task: impl Into<String>) -> Self {
        self.sub_tasks.insert(agent.into(), task.into());
        self
    }

    /// Override the dispatch strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SwarmStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Override the sub-agent concurrency cap.
    #[must_use]
    pub const fn with_max_concurrency(mut self, cap: usize) -> Self {
        self.max_concurrency = Some(cap);
        self
    }

    /// Override the per-attempt timeout, in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Override the retry budget.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Override the fail-fast policy.
    #[must_use]
    pub const fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = Some(enabled);
        self
    }

    /// Override context isolation.
    #[must_use]
    pub const fn with_isolate_context(mut self, enabled: bool) -> Self {
        self.isolate_context = Some(enabled);
        self
    }
}

/// Per-call settings for one `execute_mass_swarm` invocation.
#[derive(Debug, Clone)]
pub struct MassSwarmOptions {
    /// Settings forwarded to every inner swarm.
    pub swarm: SwarmOptions,
    /// Run the per-task swarms concurrently.
    pub parallel_tasks: bool,
    /// Concurrent-task cap override, clamped to at least 1.
    pub max_task_concurrency: Option<usize>,
}

impl Default for MassSwarmOptions {
    fn default() -> Self {
        Self {
            swarm: SwarmOptions::default(),
            parallel_tasks: true,
            max_task_concurrency: None,
        }
    }
}

impl MassSwarmOptions {
    /// Settings forwarded to every inner swarm.
    #[must_use]
    pub fn with_swarm(mut self, swarm: SwarmOptions) -> Self {
        self.swarm = swarm;
        self
    }

    /// Run the per-task swarms sequentially or concurrently.
    #[must_use]
    pub const fn with_parallel_tasks(mut self, enabled: bool) -> Self {
        self.parallel_tasks = enabled;
        self
    }

    /// Override the concurrent-task cap.
    #[must_use]
    pub const fn with_max_task_concurrency(mut self, cap: usize) -> Self {
        self.max_task_concurrency = Some(cap);
        self
    }
}
