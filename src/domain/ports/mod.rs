//! Ports: the interfaces the engine consumes and emits through.

pub mod events;
pub mod sub_agent;

pub use events::{
    NullEventSink, OperationFinished, OperationMetrics, OperationStarted, SwarmEventSink,
    TracingEventSink,
};
pub use sub_agent::SubAgent;
