//! Simulated platform settings

use serde::{Deserialize, Serialize};

/// How the in-process platform behaves when the CLI runs without a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Polls a request takes to complete
    #[serde(default = "default_latency_ticks")]
    pub latency_ticks: u64,

    /// `NotReady` answers before an avatar is delivered
    #[serde(default = "default_avatar_delay_probes")]
    pub avatar_delay_probes: u32,

    /// Edge length of generated avatars, in pixels
    #[serde(default = "default_avatar_size")]
    pub avatar_size: u32,

    /// Display name of the local user
    #[serde(default = "default_user")]
    pub user: String,

    /// Other players seeded on every leaderboard
    #[serde(default = "default_rivals")]
    pub rivals: Vec<String>,
}

fn default_latency_ticks() -> u64 {
    2
}

fn default_avatar_delay_probes() -> u32 {
    1
}

fn default_avatar_size() -> u32 {
    184
}

fn default_user() -> String {
    "player".to_string()
}

fn default_rivals() -> Vec<String> {
    ["ada", "brook", "cyd", "dara", "eli"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ticks: default_latency_ticks(),
            avatar_delay_probes: default_avatar_delay_probes(),
            avatar_size: default_avatar_size(),
            user: default_user(),
            rivals: default_rivals(),
        }
    }
}
