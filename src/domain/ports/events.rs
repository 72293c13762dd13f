//! Event sink port - structured observability records emitted by the
//! engine.
//!
//! The engine only produces well-defined records; the host wires the
//! transport. The default [`TracingEventSink`] renders them as `tracing`
//! events.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::SwarmStrategy;

/// Record emitted when a swarm or mass-swarm operation starts.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStarted {
    pub operation_id: String,
    pub correlation_id: String,
    pub strategy: SwarmStrategy,
    /// Sub-agents (swarm) or tasks (mass swarm) in the fan-out.
    pub target_count: usize,
}

/// Record emitted when a swarm or mass-swarm operation finishes.
#[derive(Debug, Clone, Serialize)]
pub struct OperationFinished {
    pub operation_id: String,
    pub correlation_id: String,
    pub strategy: SwarmStrategy,
    pub target_count: usize,
    pub successes: usize,
    pub failures: usize,
    pub duration_ms: f64,
}

/// Per-operation metrics payload.
#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub successes: usize,
    pub failures: usize,
    /// Results whose final attempt hit the per-attempt timeout.
    pub timeouts: usize,
    /// Attempts beyond the first, summed across the population.
    pub retries_used: u64,
    pub duration_ms: f64,
    /// p95 of sub-agent durations; swarm operations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_agent_duration_p95_ms: Option<f64>,
    /// p95 of inner swarm durations; mass-swarm operations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_duration_p95_ms: Option<f64>,
}

/// Sink for the engine's observability records.
pub trait SwarmEventSink: Send + Sync {
    /// An operation is about to dispatch.
    fn operation_started(&self, record: &OperationStarted);

    /// An operation finished and its report is assembled.
    fn operation_finished(&self, record: &OperationFinished);

    /// A sub-agent's final attempt failed (errored or timed out).
    fn sub_agent_failed(&self, agent: &str, error: &str, timed_out: bool);

    /// Per-operation metrics.
    fn metrics(&self, metrics: &OperationMetrics);
}

/// Default sink rendering records as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl SwarmEventSink for TracingEventSink {
    fn operation_started(&self, record: &OperationStarted) {
        info!(
            operation_id = %record.operation_id,
            correlation_id = %record.correlation_id,
            strategy = %record.strategy,
            targets = record.target_count,
            "Swarm operation started"
        );
    }

    fn operation_finished(&self, record: &OperationFinished) {
        info!(
            operation_id = %record.operation_id,
            correlation_id = %record.correlation_id,
            strategy = %record.strategy,
            targets = record.target_count,
            successes = record.successes,
            failures = record.failures,
            duration_ms = record.duration_ms,
            "Swarm operation finished"
        );
    }

    fn sub_agent_failed(&self, agent: &str, error: &str, timed_out: bool) {
        warn!(
            agent = %agent,
            error = %error,
            timed_out,
            "Sub-agent failed after final attempt"
        );
    }

    fn metrics(&self, metrics: &OperationMetrics) {
        info!(
            successes = metrics.successes,
            failures = metrics.failures,
            timeouts = metrics.timeouts,
            retries_used = metrics.retries_used,
            duration_ms = metrics.duration_ms,
            sub_agent_duration_p95_ms = ?metrics.sub_agent_duration_p95_ms,
            operation_duration_p95_ms = ?metrics.operation_duration_p95_ms,
            "Swarm operation metrics"
        );
    }
}

/// Sink that drops every record; useful in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl SwarmEventSink for NullEventSink {
    fn operation_started(&self, _record: &OperationStarted) {}
    fn operation_finished(&self, _record: &OperationFinished) {}
    fn sub_agent_failed(&self, _agent: &str, _error: &str, _timed_out: bool) {}
    fn metrics(&self, _metrics: &OperationMetrics) {}
}

/// Nearest-rank percentile over an unsorted population. Returns 0 for an
/// empty population.
pub(crate) fn percentile(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let rank = (quantile * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
