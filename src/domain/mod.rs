//! Core domain types for statsync

mod achievement;
mod call;
mod leaderboard;
mod sync_event;

pub use achievement::{
    ACHIEVEMENT_PREFIX, AchievementField, AchievementRecord, RefreshSummary, STAT_SUFFIX,
    StoreOutcome, achievement_id, stat_key,
};
pub use call::{CallHandle, CallKind};
pub use leaderboard::{
    AvatarImage, EntriesHandle, LeaderboardEntry, LeaderboardHandle, LeaderboardIdentity,
    RequestScope, ResolveState, SubjectId, UploadMethod, UploadOutcome,
};
pub use sync_event::{EventSink, SyncEvent, SyncEventKind};
