//! Shared scripted sub-agents and fixtures for integration tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use hivemind::{AgentContext, SubAgent};

/// Create a context for a test session.
pub fn ctx(session_id: &str) -> AgentContext {
    AgentContext::new(session_id)
}

/// Agent that sleeps for a fixed delay and echoes its invocation back.
pub struct EchoAgent {
    name: String,
    delay: Duration,
    calls: AtomicU32,
}

impl EchoAgent {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            calls: AtomicU32::new(0),
        }
    }

    /// How many times `execute` has been entered.
    #[allow(dead_code)]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubAgent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &str, context: &AgentContext) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(json!({
            "success": true,
            "agent": self.name,
            "task": task,
            "session_id": context.session_id(),
        }))
    }
}

/// Agent that fails its first call with a transient error and succeeds on
/// every later call.
#[allow(dead_code)]
pub struct FlakyOnceAgent {
    name: String,
    calls: AtomicU32,
}

#[allow(dead_code)]
impl FlakyOnceAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubAgent for FlakyOnceAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &str, _context: &AgentContext) -> Result<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 1 {
            Err(anyhow!("transient failure"))
        } else {
            Ok(json!({
                "success": true,
                "agent": self.name,
                "task": task,
                "calls": call,
            }))
        }
    }
}

/// Agent that always fails.
#[allow(dead_code)]
pub struct AlwaysFailAgent {
    name: String,
    calls: AtomicU32,
}

#[allow(dead_code)]
impl AlwaysFailAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubAgent for AlwaysFailAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _task: &str, _context: &AgentContext) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("forced failure"))
    }
}

/// Agent that records how many executions overlap, for asserting
/// concurrency caps.
#[allow(dead_code)]
pub struct GaugeAgent {
    name: String,
    delay: Duration,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl GaugeAgent {
    pub fn new(
        name: impl Into<String>,
        delay: Duration,
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            name: name.into(),
            delay,
            current,
            peak,
        }
    }
}

#[async_trait]
impl SubAgent for GaugeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _task: &str, _context: &AgentContext) -> Result<Value> {
        let running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({"agent": self.name}))
    }
}

/// Agent that writes a `wrote_<name>` key into its context state.
#[allow(dead_code)]
pub struct StateWriterAgent {
    name: String,
}

#[allow(dead_code)]
impl StateWriterAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SubAgent for StateWriterAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &str, context: &AgentContext) -> Result<Value> {
        context
            .state_set(format!("wrote_{}", self.name), json!(task))
            .await;
        Ok(json!({"agent": self.name}))
    }
}

/// Agent that echoes its context metadata back as output.
#[allow(dead_code)]
pub struct MetadataProbeAgent {
    name: String,
}

#[allow(dead_code)]
impl MetadataProbeAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl SubAgent for MetadataProbeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _task: &str, context: &AgentContext) -> Result<Value> {
        Ok(json!({"metadata": context.metadata()}))
    }
}
