//! Domain layer for the hivemind swarm engine.
//!
//! Pure models, ports, and errors with no infrastructure concerns.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{SwarmError, SwarmResult};
