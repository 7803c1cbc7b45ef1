//! Coordinator configuration

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Delay between the end of one reconciliation pass and the next
    #[serde(rename = "tick-interval-ms", default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1000
}

fn default_tick_interval_ms() -> u64 {
    debug!("default_tick_interval_ms: called");
    1000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            channel_buffer: 1000,
            tick_interval_ms: 1000,
        }
    }
}

impl CoordinatorConfig {
    /// Get the reconciliation tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        debug!(tick_interval_ms = %self.tick_interval_ms, "CoordinatorConfig::tick_interval: called");
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject values a coordinator cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.channel_buffer == 0 {
            return Err(eyre!("coordinator channel-buffer must be greater than zero"));
        }
        if self.tick_interval_ms == 0 {
            return Err(eyre!("coordinator tick-interval-ms must be greater than zero"));
        }
        Ok(())
    }
}
