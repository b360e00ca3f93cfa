//! Warm boot cache configuration.

use crate::error::{Result, WarmBootError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the state file written before a warm shutdown.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/var/warmboot/switch_state.json";

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

fn default_v6_traversal_divisor() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmBootConfig {
    /// State file written by the previous run.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// The ASIC can hold full-width routes in its host table. When set,
    /// /32 and /128 routes are indexed as host routes.
    #[serde(default)]
    pub host_routes_in_host_table: bool,

    /// IPv6 entries use double-wide table slots, so the IPv6 host and route
    /// walks only cover `capacity / divisor` indices.
    #[serde(default = "default_v6_traversal_divisor")]
    pub v6_traversal_divisor: u32,
}

impl Default for WarmBootConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            host_routes_in_host_table: false,
            v6_traversal_divisor: default_v6_traversal_divisor(),
        }
    }
}

impl WarmBootConfig {
    /// Load configuration from a JSON file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let config: Self = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                WarmBootError::Config(format!(
                    "failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(WarmBootError::Config(format!(
                    "failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.v6_traversal_divisor == 0 {
            return Err(WarmBootError::Config(
                "v6TraversalDivisor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of IPv6 table indices to walk for a table of `capacity`.
    pub fn v6_budget(&self, capacity: u32) -> u32 {
        capacity / self.v6_traversal_divisor.max(1)
    }
}
