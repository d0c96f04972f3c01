//! Configuration loading and management
//!
//! Configuration is immutable once loaded. Sessions and stores copy the parts
//! they need at construction; runtime state lives elsewhere.

mod io;
mod leaderboard;
mod settings;
mod simulation;

pub use leaderboard::LeaderboardConfig;
pub use settings::{AchievementConfig, Settings};
pub use simulation::SimulationConfig;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Achievement catalog settings
    #[serde(default)]
    pub achievements: AchievementConfig,

    /// Leaderboards, keyed by the name they are looked up with
    #[serde(default)]
    pub leaderboard: BTreeMap<String, LeaderboardConfig>,

    /// Behaviour of the simulated platform used by the CLI
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for: .statsync/config.toml, then the global config, then defaults
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let local_path = dir.join(".statsync/config.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        let global_path = Self::global_config_path();
        if global_path.exists() {
            return Self::from_file(&global_path);
        }

        Ok(Self::with_defaults())
    }

    /// Load from an explicit path if given, otherwise search from `dir`
    pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::from_dir(dir),
        }
    }

    /// Create a config with sensible defaults
    pub fn with_defaults() -> Self {
        let mut config = Self::default();
        config
            .leaderboard
            .insert("HighScores".to_string(), LeaderboardConfig::default());
        config
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, board) in &self.leaderboard {
            board
                .validate()
                .with_context(|| format!("Invalid leaderboard '{}'", name))?;
        }
        if self.settings.tick_interval_ms == 0 {
            anyhow::bail!("settings.tick_interval_ms must be greater than zero");
        }
        Ok(())
    }
}
