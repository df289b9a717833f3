//! Configuration for Questline (`~/.questline/config.toml`)

mod io;
mod settings;

pub use settings::{DatabaseSettings, DeferredSettings, ErrorSettings, ProgressionConfig};

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, NewLevel};
use crate::progression::ProgressionSettings;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub errors: ErrorSettings,

    /// Retry buffer for failed notifications
    #[serde(default)]
    pub deferred: DeferredSettings,

    /// Level table written on `questline init`
    #[serde(default = "default_levels")]
    pub levels: Vec<NewLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            progression: ProgressionConfig::default(),
            errors: ErrorSettings::default(),
            deferred: DeferredSettings::default(),
            levels: default_levels(),
        }
    }
}

/// Built-in five-level path
fn default_levels() -> Vec<NewLevel> {
    vec![
        NewLevel::new(1, 0, "Apprentice")
            .with_description("First steps: tooling, syntax and small programs"),
        NewLevel::new(2, 100, "Initiate")
            .with_difficulty(Difficulty::Beginner)
            .with_description("Data structures and control flow"),
        NewLevel::new(3, 300, "Adept")
            .with_difficulty(Difficulty::Intermediate)
            .with_description("Modules, testing and error handling"),
        NewLevel::new(4, 600, "Journeyman")
            .with_difficulty(Difficulty::Advanced)
            .with_description("Concurrency and persistence"),
        NewLevel::new(5, 1000, "Archmage")
            .with_difficulty(Difficulty::Expert)
            .with_description("Capstone projects"),
    ]
}

impl Config {
    /// Database file in use: `[database] path`, or the default location
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    pub fn progression_settings(&self) -> ProgressionSettings {
        ProgressionSettings {
            unlock_threshold_percent: self.progression.unlock_threshold_percent,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.deferred.sweep_interval_secs.max(1))
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let pct = self.progression.unlock_threshold_percent;
        if !(0.0..=100.0).contains(&pct) {
            bail!("progression.unlock_threshold_percent must be between 0 and 100, got {pct}");
        }
        if self.deferred.max_attempts == 0 {
            bail!("deferred.max_attempts must be at least 1");
        }

        let mut orders: Vec<u32> = self.levels.iter().map(|l| l.order).collect();
        orders.sort_unstable();
        if orders.windows(2).any(|w| w[0] == w[1]) {
            bail!("levels must have distinct order values");
        }
        Ok(())
    }
}
