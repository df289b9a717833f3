//! Settings sections of the configuration file

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::progression::DEFAULT_UNLOCK_THRESHOLD_PERCENT;

/// `[database]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; `~/.questline/progress.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[progression]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Mission completion (percent) needed to unlock a level's boss
    #[serde(default = "default_unlock_threshold_percent")]
    pub unlock_threshold_percent: f64,
}

/// `[errors]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSettings {
    /// Show details of unexpected failures instead of only their reference id
    #[serde(default)]
    pub debug: bool,
}

/// `[deferred]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredSettings {
    /// Seconds between retry sweeps of failed notifications
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Delivery attempts before a notification is dropped
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_unlock_threshold_percent() -> f64 {
    DEFAULT_UNLOCK_THRESHOLD_PERCENT
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            unlock_threshold_percent: default_unlock_threshold_percent(),
        }
    }
}

impl Default for DeferredSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}
