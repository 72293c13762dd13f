//! Single sub-agent execution: attempt, timeout, retry, classify.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::models::{AgentContext, SubAgentResult, CANCELLED_FAIL_FAST, TIMEOUT_ERROR_PREFIX};
use crate::domain::ports::{SubAgent, SwarmEventSink};

/// Outcome of one attempt, before retry accounting.
enum Attempt {
    Success(Value),
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Resolves once the cancel signal fires. A closed channel means no
/// cancellation can ever arrive, so the future stays pending.
pub(crate) async fn cancelled_signal(cancel: &mut broadcast::Receiver<()>) {
    loop {
        match cancel.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

/// Run one sub-agent to a classified result.
///
/// Executes up to `retries + 1` strictly sequential attempts with no
/// backoff between them. The per-attempt timeout bounds each `execute`
/// call independently; `None` leaves attempts unbounded.
///
/// A firing cancel signal drops the in-flight attempt future and yields a
/// failed result carrying the attempts observed so far. This function
/// knows nothing about the fail-fast policy that may drive that signal.
pub(crate) async fn run_sub_agent(
    agent: Arc<dyn SubAgent>,
    task: &str,
    context: AgentContext,
    timeout: Option<Duration>,
    retries: u32,
    mut cancel: Option<broadcast::Receiver<()>>,
    sink: &dyn SwarmEventSink,
) -> SubAgentResult {
    let agent_name = agent.name().to_string();
    let max_attempts = retries.saturating_add(1);
    let started = Instant::now();

    let mut output: Option<Value> = None;
    let mut last_error: Option<String> = None;
    let mut timed_out = false;
    let mut cancelled = false;
    let mut attempts = 0u32;

    while attempts < max_attempts {
        attempts += 1;
        let remaining = max_attempts - attempts;

        match attempt(agent.as_ref(), task, &context, timeout, cancel.as_mut()).await {
            Attempt::Success(value) => {
                output = Some(value);
                last_error = None;
                timed_out = false;
                break;
            }
            Attempt::TimedOut => {
                let seconds = timeout.map(|t| t.as_secs_f64()).unwrap_or_default();
                last_error = Some(format!("{TIMEOUT_ERROR_PREFIX}{seconds}s"));
                timed_out = true;
                if remaining > 0 {
                    debug!(agent = %agent_name, attempt = attempts, "Attempt timed out, retrying");
                    timed_out = false;
                    continue;
                }
                break;
            }
            Attempt::Failed(message) => {
                last_error = Some(message);
                if remaining > 0 {
                    debug!(agent = %agent_name, attempt = attempts, "Attempt failed, retrying");
                    continue;
                }
                break;
            }
            Attempt::Cancelled => {
                last_error = Some(CANCELLED_FAIL_FAST.to_string());
                timed_out = false;
                cancelled = true;
                break;
            }
        }
    }

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    let success = output.is_some();

    if !success && !cancelled {
        if let Some(error) = &last_error {
            sink.sub_agent_failed(&agent_name, error, timed_out);
        }
    }

    SubAgentResult {
        agent: agent_name,
        success,
        output,
        error: last_error,
        attempts,
        timed_out,
        duration_ms,
    }
}

/// One attempt under the optional timeout, racing the cancel signal.
async fn attempt(
    agent: &dyn SubAgent,
    task: &str,
    context: &AgentContext,
    timeout: Option<Duration>,
    cancel: Option<&mut broadcast::Receiver<()>>,
) -> Attempt {
    match cancel {
        Some(cancel) => {
            tokio::select! {
                biased;
                () = cancelled_signal(cancel) => Attempt::Cancelled,
                outcome = bounded_attempt(agent, task, context, timeout) => outcome,
            }
        }
        None => bounded_attempt(agent, task, context, timeout).await,
    }
}

async fn bounded_attempt(
    agent: &dyn SubAgent,
    task: &str,
    context: &AgentContext,
    timeout: Option<Duration>,
) -> Attempt {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, agent.execute(task, context)).await {
            Ok(Ok(value)) => Attempt::Success(value),
            Ok(Err(error)) => Attempt::Failed(error.to_string()),
            Err(_) => Attempt::TimedOut,
        },
        None => match agent.execute(task, context).await {
            Ok(value) => Attempt::Success(value),
            Err(error) => Attempt::Failed(error.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::NullEventSink;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Agent scripted to fail a fixed number of times before succeeding,
    /// optionally sleeping on every call.
    struct ScriptedAgent {
        name: String,
        failures_before_success: u32,
        delay: Option<Duration>,
        calls: AtomicU32,
    }

    impl ScriptedAgent {
        fn new(name: &str, failures_before_success: u32) -> Self {
            Self {
                name: name.to_string(),
                failures_before_success,
                delay: None,
                calls: AtomicU32::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SubAgent for ScriptedAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, task: &str, _context: &AgentContext) -> anyhow::Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call <= self.failures_before_success {
                Err(anyhow!("transient failure"))
            } else {
                Ok(json!({"task": task, "call": call}))
            }
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let agent = Arc::new(ScriptedAgent::new("worker", 0));
        let result = run_sub_agent(
            Arc::clone(&agent) as Arc<dyn SubAgent>,
            "build",
            AgentContext::new("s"),
            None,
            0,
            None,
            &NullEventSink,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert!(result.error.is_none());
        assert!(!result.timed_out);
        assert_eq!(result.output.unwrap()["task"], json!("build"));
        assert!(result.duration_ms >= 0.0);
    }

    #[tokio::test]
    async fn retry_recovers_a_flaky_agent() {
        let agent = Arc::new(ScriptedAgent::new("flaky", 1));
        let result = run_sub_agent(
            Arc::clone(&agent) as Arc<dyn SubAgent>,
            "build",
            AgentContext::new("s"),
            None,
            1,
            None,
            &NullEventSink,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(agent.calls(), 2);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_keep_the_last_error() {
        let agent = Arc::new(ScriptedAgent::new("doomed", 10));
        let result = run_sub_agent(
            Arc::clone(&agent) as Arc<dyn SubAgent>,
            "build",
            AgentContext::new("s"),
            None,
            2,
            None,
            &NullEventSink,
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(agent.calls(), 3);
        assert_eq!(result.error.as_deref(), Some("transient failure"));
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn timeout_marks_the_final_attempt() {
        let agent =
            Arc::new(ScriptedAgent::new("slow", 0).with_delay(Duration::from_millis(100)));
        let result = run_sub_agent(
            agent,
            "build",
            AgentContext::new("s"),
            Some(Duration::from_millis(10)),
            0,
            None,
            &NullEventSink,
        )
        .await;

        assert!(!result.success);
        assert!(result.timed_out);
        assert_eq!(result.attempts, 1);
        let error = result.error.unwrap();
        assert!(error.starts_with(TIMEOUT_ERROR_PREFIX), "got {error}");
        assert!(error.contains("0.01"));
    }

    #[tokio::test]
    async fn cancel_mid_attempt_reports_observed_attempts() {
        let agent = Arc::new(ScriptedAgent::new("hung", 0).with_delay(Duration::from_secs(30)));
        let (cancel_tx, cancel_rx) = broadcast::channel(1);

        let handle = tokio::spawn(run_sub_agent(
            agent as Arc<dyn SubAgent>,
            "build",
            AgentContext::new("s"),
            None,
            3,
            Some(cancel_rx),
            &NullEventSink,
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_tx.send(()).unwrap();

        let result = handle.await.unwrap();
        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.error.as_deref(), Some(CANCELLED_FAIL_FAST));
        assert!(!result.timed_out);
    }
}
