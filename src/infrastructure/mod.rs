//! Infrastructure: configuration loading and logging setup.

pub mod config;
pub mod logging;

pub use config::ConfigLoader;
pub use logging::{LogConfig, LogFormat, Logger};
