/*!
 * Configuration for the Flowgate driver.
 *
 * This module provides the driver's timing and channel settings with
 * sensible defaults, loadable from a file and a `FLOWGATE_` environment
 * overlay.
 */
use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeviceError, Result};

/// Driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Overall bound on waiting for a response frame, in milliseconds
    #[serde(default = "default_response_wait_ms")]
    pub response_wait_ms: u64,

    /// Spacing between transport readiness probes while waiting, in
    /// milliseconds
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Background flow poll period, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capacity of the flow-update broadcast channel; lagging subscribers
    /// lose the oldest values
    #[serde(default = "default_update_capacity")]
    pub update_capacity: usize,
}

fn default_response_wait_ms() -> u64 {
    500
}

fn default_probe_interval_ms() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_update_capacity() -> usize {
    16
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            response_wait_ms: default_response_wait_ms(),
            probe_interval_ms: default_probe_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            update_capacity: default_update_capacity(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from a file, overlaid with `FLOWGATE_*`
    /// environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ConfigLib::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FLOWGATE"))
            .build()
            .map_err(|e| DeviceError::Config(format!("failed to load configuration: {}", e)))?;

        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| DeviceError::Config(format!("invalid configuration: {}", e)))?;

        debug!(?cfg, "loaded driver configuration");
        Ok(cfg)
    }

    /// Response wait bound as a [`Duration`].
    pub fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }

    /// Readiness probe spacing as a [`Duration`].
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Poll period as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_timing() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.response_wait(), Duration::from_millis(500));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(2000));
        assert!(cfg.probe_interval() < cfg.response_wait());
        assert!(cfg.update_capacity > 0);
    }
}
