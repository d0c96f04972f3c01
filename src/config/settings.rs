//! Settings configuration types

use serde::{Deserialize, Serialize};

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Milliseconds between ticks of the CLI pump loop
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks the CLI waits for a completion before giving up
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_max_ticks() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

/// Achievement catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementConfig {
    /// Highest achievement ordinal; the catalog holds `count + 1` records
    #[serde(default = "default_achievement_count")]
    pub count: u32,
}

fn default_achievement_count() -> u32 {
    10
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            count: default_achievement_count(),
        }
    }
}
