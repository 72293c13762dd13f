//! Swarm orchestrator: public API, report assembly, and the mass-swarm
//! driver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::domain::errors::SwarmResult;
use crate::domain::models::{
    AgentContext, MassSwarmOptions, MassSwarmReport, SubAgentResult, SwarmConfig,
    SwarmHistoryEntry, SwarmHistoryKind, SwarmOptions, SwarmReport,
};
use crate::domain::ports::events::percentile;
use crate::domain::ports::{
    OperationFinished, OperationMetrics, OperationStarted, SubAgent, SwarmEventSink,
    TracingEventSink,
};
use crate::services::agent_registry::AgentRegistry;
use crate::services::dispatch::{dispatch, DispatchPlan};

/// Orchestrates swarms of named sub-agents.
///
/// One swarm fans a single task out across a selected set of sub-agents
/// under bounded concurrency, per-attempt timeouts, bounded retries, and
/// an optional fail-fast policy. A mass swarm drives one swarm per input
/// task with an independent task-level concurrency cap.
///
/// The orchestrator is instance-scoped: the registry is its only
/// cross-call state. It also implements [`SubAgent`], so it can itself be
/// registered as a sub-agent of another orchestrator.
pub struct SwarmOrchestrator {
    name: String,
    config: SwarmConfig,
    registry: AgentRegistry,
    events: Arc<dyn SwarmEventSink>,
}

impl SwarmOrchestrator {
    /// Create an orchestrator with validated configuration.
    pub fn new(name: impl Into<String>, config: SwarmConfig) -> SwarmResult<Self> {
        config.validate()?;
        let name = name.into();
        Ok(Self {
            registry: AgentRegistry::new(name.clone()),
            name,
            config,
            events: Arc::new(TracingEventSink),
        })
    }

    /// Replace the observability sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn SwarmEventSink>) -> Self {
        self.events = sink;
        self
    }

    /// The orchestrator's own (reserved) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a sub-agent under its own name.
    ///
    /// Fails when the name equals the orchestrator's own; re-registering
    /// an existing name replaces the prior agent silently.
    pub fn add_sub_agent(&self, agent: Arc<dyn SubAgent>) -> SwarmResult<()> {
        self.registry.add(agent)
    }

    /// Register several sub-agents in iteration order.
    pub fn add_sub_agents<I>(&self, agents: I) -> SwarmResult<()>
    where
        I: IntoIterator<Item = Arc<dyn SubAgent>>,
    {
        self.registry.add_many(agents)
    }

    /// Remove a sub-agent; returns whether it was registered.
    pub fn remove_sub_agent(&self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Registered sub-agent names in registration order.
    pub fn list_sub_agents(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Fan one task out across the selected sub-agents and report every
    /// per-agent outcome.
    ///
    /// Sub-agent failures, timeouts, and cancellations never error here;
    /// they are classified into the report and flip its `success` flag.
    /// The call itself errors only on an unknown target agent, before any
    /// execution starts.
    pub async fn execute_swarm(
        &self,
        task: &str,
        context: &AgentContext,
        options: SwarmOptions,
    ) -> SwarmResult<SwarmReport> {
        let targets = self.registry.resolve_targets(options.target_agents.as_deref())?;
        let correlation_id = new_id();
        Ok(self.run_swarm(task, context, &targets, &options, correlation_id).await)
    }

    /// Run one swarm per input task and aggregate the per-task reports in
    /// input order.
    ///
    /// Task-level concurrency is bounded by `max_task_concurrency`,
    /// independently of the per-swarm sub-agent cap. Every inner swarm
    /// reuses the mass operation's correlation id and appends its own
    /// history entry; the mass operation appends one aggregate entry on
    /// top.
    pub async fn execute_mass_swarm(
        &self,
        tasks: &[String],
        context: &AgentContext,
        options: MassSwarmOptions,
    ) -> SwarmResult<MassSwarmReport> {
        let targets = self
            .registry
            .resolve_targets(options.swarm.target_agents.as_deref())?;
        let operation_id = new_id();
        let correlation_id = new_id();
        let max_task_concurrency = options
            .max_task_concurrency
            .unwrap_or(self.config.max_task_concurrency)
            .max(1);
        let strategy = options.swarm.strategy.unwrap_or(self.config.strategy);

        let started_at = Utc::now();
        let clock = Instant::now();

        self.events.operation_started(&OperationStarted {
            operation_id: operation_id.clone(),
            correlation_id: correlation_id.clone(),
            strategy,
            target_count: tasks.len(),
        });

        let operations = if options.parallel_tasks {
            let gate = Semaphore::new(max_task_concurrency);
            join_all(tasks.iter().map(|task| {
                let gate = &gate;
                let targets = &targets;
                let swarm_options = &options.swarm;
                let correlation_id = correlation_id.clone();
                async move {
                    let _permit = gate.acquire().await;
                    self.run_swarm(task, context, targets, swarm_options, correlation_id)
                        .await
                }
            }))
            .await
        } else {
            let mut reports = Vec::with_capacity(tasks.len());
            for task in tasks {
                reports.push(
                    self.run_swarm(task, context, &targets, &options.swarm, correlation_id.clone())
                        .await,
                );
            }
            reports
        };

        let finished_at = Utc::now();
        let duration_ms = clock.elapsed().as_secs_f64() * 1000.0;
        let successful_tasks = operations.iter().filter(|op| op.success).count();
        let failed_tasks = operations.len() - successful_tasks;
        let success = failed_tasks == 0;

        context
            .push_swarm_history(to_history_value(&SwarmHistoryEntry {
                operation_id: operation_id.clone(),
                kind: SwarmHistoryKind::MassSwarm,
                task: None,
                tasks: Some(tasks.to_vec()),
                success,
                started_at,
                duration_ms,
                successful: successful_tasks,
                failed: failed_tasks,
            }))
            .await;

        let operation_durations: Vec<f64> =
            operations.iter().map(|op| op.duration_ms).collect();
        self.events.metrics(&OperationMetrics {
            successes: successful_tasks,
            failures: failed_tasks,
            timeouts: operations
                .iter()
                .flat_map(|op| &op.results)
                .filter(|r| r.timed_out)
                .count(),
            retries_used: operations
                .iter()
                .flat_map(|op| &op.results)
                .map(|r| u64::from(r.attempts.saturating_sub(1)))
                .sum(),
            duration_ms,
            sub_agent_duration_p95_ms: None,
            operation_duration_p95_ms: Some(percentile(&operation_durations, 0.95)),
        });
        self.events.operation_finished(&OperationFinished {
            operation_id: operation_id.clone(),
            correlation_id: correlation_id.clone(),
            strategy,
            target_count: tasks.len(),
            successes: successful_tasks,
            failures: failed_tasks,
            duration_ms,
        });

        Ok(MassSwarmReport {
            success,
            total_tasks: operations.len(),
            successful_tasks,
            failed_tasks,
            operations,
            started_at,
            finished_at,
            duration_ms,
            operation_id,
            correlation_id,
        })
    }

    /// Resolve one dispatch plan from the construction defaults and the
    /// per-call overrides.
    fn plan_for(&self, options: &SwarmOptions) -> DispatchPlan {
        let timeout_secs = options.timeout.or(self.config.sub_agent_timeout);
        DispatchPlan {
            strategy: options.strategy.unwrap_or(self.config.strategy),
            max_concurrency: options
                .max_concurrency
                .unwrap_or(self.config.max_concurrency)
                .max(1),
            timeout: timeout_secs
                .filter(|t| t.is_finite() && *t > 0.0)
                .map(Duration::from_secs_f64),
            retries: options.retries.unwrap_or(self.config.sub_agent_retries),
            fail_fast: options.fail_fast.unwrap_or(self.config.fail_fast),
            isolate_context: options
                .isolate_context
                .unwrap_or(self.config.isolate_context),
            orchestrator: self.name.clone(),
        }
    }

    /// Drive one swarm over already-resolved targets. Infallible: every
    /// outcome is classified into the report.
    async fn run_swarm(
        &self,
        task: &str,
        context: &AgentContext,
        targets: &[Arc<dyn SubAgent>],
        options: &SwarmOptions,
        correlation_id: String,
    ) -> SwarmReport {
        let plan = self.plan_for(options);
        let operation_id = new_id();
        let started_at = Utc::now();
        let clock = Instant::now();

        self.events.operation_started(&OperationStarted {
            operation_id: operation_id.clone(),
            correlation_id: correlation_id.clone(),
            strategy: plan.strategy,
            target_count: targets.len(),
        });

        let results = dispatch(targets, task, &options.sub_tasks, context, &plan, &self.events).await;

        let finished_at = Utc::now();
        let duration_ms = clock.elapsed().as_secs_f64() * 1000.0;
        let successful_agents = results.iter().filter(|r| r.success).count();
        let failed_agents = results.len() - successful_agents;
        let success = failed_agents == 0;

        context
            .push_swarm_history(to_history_value(&SwarmHistoryEntry {
                operation_id: operation_id.clone(),
                kind: SwarmHistoryKind::Swarm,
                task: Some(task.to_string()),
                tasks: None,
                success,
                started_at,
                duration_ms,
                successful: successful_agents,
                failed: failed_agents,
            }))
            .await;

        self.events.metrics(&swarm_metrics(&results, duration_ms));
        self.events.operation_finished(&OperationFinished {
            operation_id: operation_id.clone(),
            correlation_id: correlation_id.clone(),
            strategy: plan.strategy,
            target_count: targets.len(),
            successes: successful_agents,
            failures: failed_agents,
            duration_ms,
        });

        SwarmReport {
            success,
            strategy: plan.strategy,
            total_agents: results.len(),
            successful_agents,
            failed_agents,
            summary: Some(format!(
                "{successful_agents}/{} sub-agents succeeded",
                results.len()
            )),
            results,
            started_at,
            finished_at,
            duration_ms,
            operation_id,
            correlation_id,
        }
    }
}

#[async_trait]
impl SubAgent for SwarmOrchestrator {
    fn name(&self) -> &str {
        &self.name
    }

    /// Delegates to [`SwarmOrchestrator::execute_swarm`] with default
    /// settings, returning the report as a JSON value.
    async fn execute(&self, task: &str, context: &AgentContext) -> Result<Value> {
        let report = self
            .execute_swarm(task, context, SwarmOptions::default())
            .await?;
        Ok(serde_json::to_value(report)?)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn to_history_value(entry: &SwarmHistoryEntry) -> Value {
    serde_json::to_value(entry).unwrap_or(Value::Null)
}

fn swarm_metrics(results: &[SubAgentResult], duration_ms: f64) -> OperationMetrics {
    let successes = results.iter().filter(|r| r.success).count();
    let durations: Vec<f64> = results.iter().map(|r| r.duration_ms).collect();
    OperationMetrics {
        successes,
        failures: results.len() - successes,
        timeouts: results.iter().filter(|r| r.timed_out).count(),
        retries_used: results
            .iter()
            .map(|r| u64::from(r.attempts.saturating_sub(1)))
            .sum(),
        duration_ms,
        sub_agent_duration_p95_ms: Some(percentile(&durations, 0.95)),
        operation_duration_p95_ms: None,
    }
}
