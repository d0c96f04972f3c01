//! Call handle types for asynchronous platform requests

use serde::{Deserialize, Serialize};

/// Opaque token correlating an issued request with its later completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallHandle(pub u64);

impl std::fmt::Display for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

/// The kind of request a call handle was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Find a leaderboard by name
    FindLeaderboard,
    /// Download a window of leaderboard entries
    DownloadEntries,
    /// Upload a score to a leaderboard
    UploadScore,
    /// Request the current user's stats snapshot
    RequestUserStats,
    /// Flush local stats and achievements to the service
    StoreStats,
}

impl CallKind {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::FindLeaderboard => "find_leaderboard",
            CallKind::DownloadEntries => "download_entries",
            CallKind::UploadScore => "upload_score",
            CallKind::RequestUserStats => "request_user_stats",
            CallKind::StoreStats => "store_stats",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
