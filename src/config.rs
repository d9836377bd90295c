//! Configuration for the coordination core, loaded the way `platform/config.rs`
//! loads `PlatformConfig`: an optional TOML file overridden by environment
//! variables under a single prefix.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config/coordination.toml";
const ENV_PREFIX: &str = "COORD";

/// Tunables for the Context State Manager's cache and background sweepers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsmSettings {
    /// Per-project cache freshness window, in seconds.
    pub cache_ttl_secs: u64,
    /// How often the expired-cache-entry sweeper runs, in seconds.
    pub cache_sweep_interval_secs: u64,
    /// Idle-context warning threshold, in hours.
    pub idle_context_warn_hours: u64,
}

impl Default for CsmSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            cache_sweep_interval_secs: 300,
            idle_context_warn_hours: 24,
        }
    }
}

/// Tunables for the agent registry's health tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Heartbeat staleness threshold, in seconds, past which an agent is unhealthy.
    pub heartbeat_timeout_secs: u64,
    /// How often the health-check loop runs, in seconds.
    pub health_check_interval_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: 300,
            health_check_interval_secs: 30,
        }
    }
}

/// Tunables for the task orchestrator's driver loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Driver loop tick interval, in seconds.
    pub tick_interval_secs: u64,
    /// Default per-step timeout, in minutes, when a step does not specify one.
    pub default_step_timeout_minutes: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            default_step_timeout_minutes: 30,
        }
    }
}

/// Root configuration for the coordination core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub csm: CsmSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
}

impl CoreConfig {
    /// Load configuration from the default path (if present) layered under
    /// `COORD__*` environment variable overrides.
    pub fn load() -> Result<Self, crate::error::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit path, or the default path if `None`.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self, crate::error::ConfigError> {
        let mut builder = Config::builder();

        builder = match path {
            Some(p) => builder.add_source(File::from(p).format(FileFormat::Toml).required(true)),
            None => builder.add_source(
                File::from(PathBuf::from(DEFAULT_CONFIG_PATH))
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
