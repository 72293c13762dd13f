//! Hierarchical configuration loading for the swarm engine.
//!
//! Precedence (lowest to highest):
//! 1. Programmatic defaults (Serialized)
//! 2. `hivemind.yaml` in the working directory
//! 3. Environment variables (`HIVEMIND_*` prefix, highest priority)
//!
//! The host is free to bypass this entirely and construct a
//! [`SwarmConfig`] directly.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::models::SwarmConfig;

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults, `hivemind.yaml`, and environment.
    pub fn load() -> Result<SwarmConfig> {
        let config: SwarmConfig = Figment::new()
            .merge(Serialized::defaults(SwarmConfig::default()))
            .merge(Yaml::file("hivemind.yaml"))
            .merge(Env::prefixed("HIVEMIND_"))
            .extract()
            .context("Failed to extract swarm configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file over the defaults.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<SwarmConfig> {
        let config: SwarmConfig = Figment::new()
            .merge(Serialized::defaults(SwarmConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        config.validate()?;
        Ok(config)
    }
}
