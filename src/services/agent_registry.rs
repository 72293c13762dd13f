//! Named sub-agent registry with registration-order listing.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::errors::{SwarmError, SwarmResult};
use crate::domain::ports::SubAgent;

/// Holds the sub-agents one orchestrator dispatches to, keyed by name.
///
/// Registration order is preserved and drives default target resolution.
/// Reads are lock-guarded so a running swarm can resolve and look up
/// concurrently; mutating the registry while a swarm is running is not
/// supported.
pub struct AgentRegistry {
    reserved_name: String,
    agents: RwLock<Vec<Arc<dyn SubAgent>>>,
}

impl AgentRegistry {
    /// Create a registry whose reserved name (the orchestrator's own) can
    /// never be registered.
    pub fn new(reserved_name: impl Into<String>) -> Self {
        Self {
            reserved_name: reserved_name.into(),
            agents: RwLock::new(Vec::new()),
        }
    }

    /// Register an agent under its own name.
    ///
    /// Re-registering an existing name replaces the prior agent in place,
    /// keeping its original registration position (last writer wins).
    pub fn add(&self, agent: Arc<dyn SubAgent>) -> SwarmResult<()> {
        let name = agent.name().to_string();
        if name.is_empty() {
            return Err(SwarmError::InvalidConfiguration(
                "sub-agent name must not be empty".to_string(),
            ));
        }
        if name == self.reserved_name {
            return Err(SwarmError::NamingConflict(name));
        }

        let mut agents = self.write_agents();
        if let Some(slot) = agents.iter_mut().find(|a| a.name() == name) {
            *slot = agent;
        } else {
            agents.push(agent);
        }
        Ok(())
    }

    /// Register several agents in iteration order.
    pub fn add_many<I>(&self, agents: I) -> SwarmResult<()>
    where
        I: IntoIterator<Item = Arc<dyn SubAgent>>,
    {
        for agent in agents {
            self.add(agent)?;
        }
        Ok(())
    }

    /// Remove an agent; returns whether it was registered.
    pub fn remove(&self, name: &str) -> bool {
        let mut agents = self.write_agents();
        match agents.iter().position(|a| a.name() == name) {
            Some(index) => {
                agents.remove(index);
                true
            }
            None => false,
        }
    }

    /// Registered names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.read_agents()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Look up one agent by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn SubAgent>> {
        self.read_agents()
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.read_agents().len()
    }

    /// True when no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.read_agents().is_empty()
    }

    /// Resolve the ordered fan-out targets for one swarm invocation.
    ///
    /// A filter selects exactly those agents in caller order; an unknown
    /// name fails the whole invocation before anything runs. Without a
    /// filter, all agents are targeted in registration order.
    pub fn resolve_targets(
        &self,
        filter: Option<&[String]>,
    ) -> SwarmResult<Vec<Arc<dyn SubAgent>>> {
        let agents = self.read_agents();
        match filter {
            Some(names) => names
                .iter()
                .map(|name| {
                    agents
                        .iter()
                        .find(|a| a.name() == name.as_str())
                        .cloned()
                        .ok_or_else(|| SwarmError::UnknownAgent(name.clone()))
                })
                .collect(),
            None => Ok(agents.clone()),
        }
    }

    fn read_agents(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn SubAgent>>> {
        self.agents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_agents(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn SubAgent>>> {
        self.agents.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentContext;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StubAgent {
        name: String,
        tag: &'static str,
    }

    impl StubAgent {
        fn register(name: &str, tag: &'static str) -> Arc<dyn SubAgent> {
            Arc::new(Self {
                name: name.to_string(),
                tag,
            })
        }
    }

    #[async_trait]
    impl SubAgent for StubAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, _task: &str, _context: &AgentContext) -> Result<Value> {
            Ok(json!(self.tag))
        }
    }

    #[test]
    fn lists_names_in_registration_order() {
        let registry = AgentRegistry::new("overseer");
        registry.add(StubAgent::register("charlie", "c")).unwrap();
        registry.add(StubAgent::register("alpha", "a")).unwrap();
        registry.add(StubAgent::register("bravo", "b")).unwrap();

        assert_eq!(registry.list(), vec!["charlie", "alpha", "bravo"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn replaces_existing_name_in_place() {
        let registry = AgentRegistry::new("overseer");
        registry.add(StubAgent::register("alpha", "old")).unwrap();
        registry.add(StubAgent::register("bravo", "b")).unwrap();
        registry.add(StubAgent::register("alpha", "new")).unwrap();

        assert_eq!(registry.list(), vec!["alpha", "bravo"]);
        let agent = registry.lookup("alpha").unwrap();
        let output = tokio_test::block_on(agent.execute("t", &AgentContext::new("s"))).unwrap();
        assert_eq!(output, json!("new"));
    }

    #[test]
    fn rejects_the_reserved_name() {
        let registry = AgentRegistry::new("overseer");
        let err = registry.add(StubAgent::register("overseer", "x")).unwrap_err();
        assert!(matches!(err, SwarmError::NamingConflict(name) if name == "overseer"));
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_an_empty_name() {
        let registry = AgentRegistry::new("overseer");
        assert!(matches!(
            registry.add(StubAgent::register("", "x")),
            Err(SwarmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = AgentRegistry::new("overseer");
        registry.add(StubAgent::register("alpha", "a")).unwrap();

        assert!(registry.remove("alpha"));
        assert!(!registry.remove("alpha"));
        assert!(registry.lookup("alpha").is_none());
    }

    #[test]
    fn resolves_filtered_targets_in_caller_order() {
        let registry = AgentRegistry::new("overseer");
        registry.add(StubAgent::register("alpha", "a")).unwrap();
        registry.add(StubAgent::register("bravo", "b")).unwrap();

        let filter = vec!["bravo".to_string(), "alpha".to_string()];
        let targets = registry.resolve_targets(Some(&filter)).unwrap();
        let names: Vec<&str> = targets.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["bravo", "alpha"]);
    }

    #[test]
    fn unknown_filter_name_fails_resolution() {
        let registry = AgentRegistry::new("overseer");
        registry.add(StubAgent::register("alpha", "a")).unwrap();

        let filter = vec!["ghost".to_string()];
        let err = registry.resolve_targets(Some(&filter)).unwrap_err();
        assert!(matches!(err, SwarmError::UnknownAgent(name) if name == "ghost"));
    }
}
