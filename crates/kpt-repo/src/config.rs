//! Orchestration cache configuration (SPEC_FULL.md §1.1 "Configuration").
//!
//! Grounded on `sherpack-repo::config::RepositoryConfig`'s pattern of a
//! `serde_yaml`-loaded config struct with `Default` baking in sane values so
//! the CORE never requires a config file to function.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Periodic refresh interval, recommended one minute (spec.md §4.7).
    pub refresh_interval_secs: u64,
    /// Bound on the watch event channel, preventing a slow watcher from
    /// growing memory unboundedly (spec.md §5).
    pub watch_high_water_mark: usize,
    /// Capability gate for `exec` function specs (spec.md §6).
    pub allow_exec: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            watch_high_water_mark: 256,
            allow_exec: false,
        }
    }
}

impl OrchestrationConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(kpt_core::CoreError::from)?;
        let config = serde_yaml::from_str(&text).map_err(|source| kpt_core::CoreError::MalformedYaml {
            path: String::new(),
            source,
        })?;
        Ok(config)
    }
}
