//! Named leaderboards: resolution, score submission and entry download

mod session;

pub use session::{
    DownloadState, EntriesResult, LeaderboardSession, LeaderboardSnapshot, ResolveResult,
    UploadState,
};

use crate::calls::CallError;
use crate::domain::CallKind;

/// Error type for leaderboard operations
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("leaderboard '{0}' has not been resolved")]
    NotResolved(String),

    #[error("leaderboard '{0}' is still resolving")]
    Resolving(String),

    #[error("leaderboard '{0}' does not exist on the service")]
    NotFound(String),

    #[error("{0} failed at the transport level")]
    IoFailure(CallKind),

    #[error("superseded by a newer request")]
    Superseded,

    #[error(transparent)]
    Registration(#[from] CallError),
}
