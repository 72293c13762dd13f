//! Strategy engine: sequential and bounded-parallel dispatch with
//! fail-fast cancellation of outstanding work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tracing::{debug, warn};

use crate::domain::models::{
    AgentContext, SubAgentResult, SwarmStrategy, CANCELLED_FAIL_FAST, SKIP_FAIL_FAST,
};
use crate::domain::ports::{SubAgent, SwarmEventSink};
use crate::services::agent_runner::{cancelled_signal, run_sub_agent};

/// Resolved execution settings for one dispatch.
#[derive(Debug, Clone)]
pub(crate) struct DispatchPlan {
    pub strategy: SwarmStrategy,
    pub max_concurrency: usize,
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub fail_fast: bool,
    pub isolate_context: bool,
    /// Orchestrator name stamped into derived sub-contexts.
    pub orchestrator: String,
}

impl DispatchPlan {
    async fn sub_context(&self, parent: &AgentContext, sub_agent: &str) -> AgentContext {
        if self.isolate_context {
            parent.derive_sub_context(&self.orchestrator, sub_agent).await
        } else {
            parent.clone()
        }
    }
}

/// Broadcasts a cancel signal if the dispatch future is dropped before
/// every worker reported, so externally cancelled swarms wind their
/// workers down instead of leaking them.
struct CancelGuard {
    cancel_tx: broadcast::Sender<()>,
    armed: bool,
}

impl CancelGuard {
    const fn new(cancel_tx: broadcast::Sender<()>) -> Self {
        Self {
            cancel_tx,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.cancel_tx.send(());
        }
    }
}

/// Dispatch the task across the resolved targets and return one result
/// per target, in original target order.
pub(crate) async fn dispatch(
    targets: &[Arc<dyn SubAgent>],
    task: &str,
    sub_tasks: &HashMap<String, String>,
    context: &AgentContext,
    plan: &DispatchPlan,
    sink: &Arc<dyn SwarmEventSink>,
) -> Vec<SubAgentResult> {
    match plan.strategy {
        SwarmStrategy::Sequential => {
            dispatch_sequential(targets, task, sub_tasks, context, plan, sink).await
        }
        SwarmStrategy::Parallel => {
            dispatch_parallel(targets, task, sub_tasks, context, plan, sink).await
        }
    }
}

async fn dispatch_sequential(
    targets: &[Arc<dyn SubAgent>],
    task: &str,
    sub_tasks: &HashMap<String, String>,
    context: &AgentContext,
    plan: &DispatchPlan,
    sink: &Arc<dyn SwarmEventSink>,
) -> Vec<SubAgentResult> {
    let mut results = Vec::with_capacity(targets.len());
    let mut halted = false;

    for agent in targets {
        if halted {
            results.push(SubAgentResult::skipped(agent.name(), SKIP_FAIL_FAST));
            continue;
        }

        let agent_task = task_for(agent.name(), task, sub_tasks);
        let sub_context = plan.sub_context(context, agent.name()).await;
        let result = run_sub_agent(
            Arc::clone(agent),
            agent_task,
            sub_context,
            plan.timeout,
            plan.retries,
            None,
            sink.as_ref(),
        )
        .await;

        if plan.fail_fast && !result.success {
            debug!(agent = %result.agent, "Fail-fast triggered, skipping remaining targets");
            halted = true;
        }
        results.push(result);
    }

    results
}

async fn dispatch_parallel(
    targets: &[Arc<dyn SubAgent>],
    task: &str,
    sub_tasks: &HashMap<String, String>,
    context: &AgentContext,
    plan: &DispatchPlan,
    sink: &Arc<dyn SwarmEventSink>,
) -> Vec<SubAgentResult> {
    let total = targets.len();
    if total == 0 {
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(plan.max_concurrency.max(1)));
    let (cancel_tx, _) = broadcast::channel::<()>(1);
    let cancelled = Arc::new(AtomicBool::new(false));
    let (done_tx, mut done_rx) = mpsc::channel::<(usize, SubAgentResult)>(total);

    for (index, agent) in targets.iter().enumerate() {
        let agent = Arc::clone(agent);
        let agent_task = task_for(agent.name(), task, sub_tasks).to_string();
        let parent = context.clone();
        let plan = plan.clone();
        let semaphore = Arc::clone(&semaphore);
        let cancelled = Arc::clone(&cancelled);
        let cancel_tx = cancel_tx.clone();
        let sink = Arc::clone(sink);
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let mut cancel_rx = cancel_tx.subscribe();

            // Wait for a slot unless fail-fast cancels the unit first.
            let permit = tokio::select! {
                biased;
                () = cancelled_signal(&mut cancel_rx) => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            // The latch covers a cancellation racing the acquire.
            let result = if permit.is_some() && !cancelled.load(Ordering::Acquire) {
                let sub_context = plan.sub_context(&parent, agent.name()).await;
                run_sub_agent(
                    agent,
                    &agent_task,
                    sub_context,
                    plan.timeout,
                    plan.retries,
                    Some(cancel_rx),
                    sink.as_ref(),
                )
                .await
            } else {
                SubAgentResult::skipped(agent.name(), CANCELLED_FAIL_FAST)
            };

            // Latch fail-fast before releasing the permit so the next unit
            // in the semaphore queue already observes it.
            if plan.fail_fast && !result.success && !cancelled.swap(true, Ordering::AcqRel) {
                debug!(agent = %result.agent, "Fail-fast triggered, cancelling outstanding units");
                let _ = cancel_tx.send(());
            }
            drop(permit);

            let _ = done_tx.send((index, result)).await;
        });
    }
    drop(done_tx);

    let mut guard = CancelGuard::new(cancel_tx);
    let mut slots: Vec<Option<SubAgentResult>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    while let Some((index, result)) = done_rx.recv().await {
        slots[index] = Some(result);
    }
    guard.disarm();

    // Re-emit in original target order; a slot can only be empty if its
    // worker died without reporting.
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                warn!(agent = %targets[index].name(), "Worker terminated without reporting a result");
                SubAgentResult::skipped(targets[index].name(), CANCELLED_FAIL_FAST)
            })
        })
        .collect()
}

fn task_for<'a>(agent: &str, task: &'a str, sub_tasks: &'a HashMap<String, String>) -> &'a str {
    sub_tasks.get(agent).map_or(task, String::as_str)
}
