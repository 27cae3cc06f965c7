//! Wait configuration parser.
//!
//! Mirrors the autoscaling-group resource attributes that drive capacity
//! waiting. Accepts TOML files like:
//!
//! ```toml
//! wait_for_capacity_timeout = "10m"
//! min_size = 2
//! desired_capacity = 4
//! wait_for_elb_capacity = 4
//!
//! [poll]
//! strategy = "exponential"
//! initial_interval = "500ms"
//! max_interval = "10s"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};
use crate::types::CapacityBounds;

pub const DEFAULT_TIMEOUT: &str = "10m";
pub const DEFAULT_INITIAL_INTERVAL: &str = "500ms";
pub const DEFAULT_MAX_INTERVAL: &str = "10s";

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWaitConfig {
    /// How long to wait for capacity; "0" disables waiting.
    #[serde(default = "default_timeout")]
    pub wait_for_capacity_timeout: String,
    #[serde(default)]
    pub min_size: u32,
    #[serde(default)]
    pub desired_capacity: u32,
    #[serde(default)]
    pub min_elb_capacity: u32,
    #[serde(default)]
    pub wait_for_elb_capacity: u32,
    #[serde(default)]
    pub poll: Option<PollConfig>,
}

/// Polling cadence between snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub strategy: Option<PollStrategy>,
    pub initial_interval: Option<String>,
    pub max_interval: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStrategy {
    /// Double the interval after every unsatisfied poll, up to `max_interval`.
    #[default]
    Exponential,
    /// Always wait `initial_interval`.
    Fixed,
}

impl Default for GroupWaitConfig {
    fn default() -> Self {
        Self {
            wait_for_capacity_timeout: default_timeout(),
            min_size: 0,
            desired_capacity: 0,
            min_elb_capacity: 0,
            wait_for_elb_capacity: 0,
            poll: None,
        }
    }
}

impl GroupWaitConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parsed `wait_for_capacity_timeout`.
    pub fn timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.wait_for_capacity_timeout)
    }

    pub fn bounds(&self) -> CapacityBounds {
        CapacityBounds {
            min_members: self.min_size,
            desired_members: self.desired_capacity,
            min_attached: self.min_elb_capacity,
            desired_attached: self.wait_for_elb_capacity,
        }
    }

    pub fn poll(&self) -> PollConfig {
        self.poll.clone().unwrap_or_default()
    }
}

impl PollConfig {
    pub fn strategy(&self) -> PollStrategy {
        self.strategy.unwrap_or_default()
    }

    pub fn initial_interval(&self) -> ConfigResult<Duration> {
        parse_duration(
            self.initial_interval
                .as_deref()
                .unwrap_or(DEFAULT_INITIAL_INTERVAL),
        )
    }

    pub fn max_interval(&self) -> ConfigResult<Duration> {
        parse_duration(self.max_interval.as_deref().unwrap_or(DEFAULT_MAX_INTERVAL))
    }
}
