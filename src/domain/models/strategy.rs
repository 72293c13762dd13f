//! Dispatch strategy for fanning a task out across sub-agents.

use serde::{Deserialize, Serialize};

/// How a swarm dispatches work across its resolved targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SwarmStrategy {
    /// Fan out concurrently, bounded by the configured concurrency cap.
    #[default]
    Parallel,
    /// Run targets one at a time in target order.
    Sequential,
}

impl SwarmStrategy {
    /// Parse a strategy name leniently.
    ///
    /// Case and surrounding whitespace are ignored; unrecognized values
    /// silently fall back to [`SwarmStrategy::Parallel`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Self::Sequential,
            _ => Self::Parallel,
        }
    }

    /// The canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

impl From<String> for SwarmStrategy {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl std::fmt::Display for SwarmStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
