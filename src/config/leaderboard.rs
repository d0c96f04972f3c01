//! Leaderboard configuration

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::{RequestScope, UploadMethod};

/// Per-leaderboard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// First rank (or offset, for `global_around_user`) of the download window
    #[serde(default = "default_range_start")]
    pub range_start: i32,

    /// Last rank (or offset) of the download window, inclusive
    #[serde(default = "default_range_end")]
    pub range_end: i32,

    /// Which population the download targets
    #[serde(default)]
    pub scope: RequestScope,

    /// How submitted scores merge with the stored score
    #[serde(default)]
    pub upload_method: UploadMethod,
}

fn default_range_start() -> i32 {
    1
}

fn default_range_end() -> i32 {
    10
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            range_start: default_range_start(),
            range_end: default_range_end(),
            scope: RequestScope::default(),
            upload_method: UploadMethod::default(),
        }
    }
}

impl LeaderboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.range_start > self.range_end {
            bail!(
                "range_start ({}) is greater than range_end ({})",
                self.range_start,
                self.range_end
            );
        }
        if self.scope == RequestScope::Global && self.range_start < 1 {
            bail!("global ranges are 1-based; range_start must be at least 1");
        }
        Ok(())
    }
}
