//! Achievement catalog and its reconciliation with the platform

mod catalog;
mod store;

pub use catalog::AchievementCatalog;
pub use store::{AchievementStore, RefreshResult};

use crate::calls::CallError;
use crate::domain::CallKind;

/// Error type for achievement and stat operations
#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("unknown achievement '{0}'")]
    UnknownAchievement(String),

    #[error("achievement catalog has not been initialized")]
    NotInitialized,

    #[error("service refused the change to '{0}'")]
    Rejected(String),

    #[error("service has no data for '{0}'")]
    Unavailable(String),

    #[error("{0} failed at the transport level")]
    IoFailure(CallKind),

    #[error(transparent)]
    Registration(#[from] CallError),
}
