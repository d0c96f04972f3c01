//! Abstract platform service boundary
//!
//! Asynchronous operations return a [`CallHandle`] immediately; their results
//! surface later from [`PlatformService::poll_completed`]. Everything else on
//! the trait is a synchronous, non-blocking probe of data the service already
//! holds locally (downloaded entries, received stats).
//!
//! Implementations take `&self` and are shared as `Arc<dyn PlatformService>`,
//! so they are responsible for their own interior mutability.

mod image;
mod memory;

pub use image::probe_image;
pub use memory::{MemoryService, ServiceCounters};

use crate::domain::{
    AchievementField, AvatarImage, CallHandle, CallKind, EntriesHandle, LeaderboardHandle,
    RequestScope, SubjectId, UploadMethod, UploadOutcome,
};

/// Result of a find-by-name request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindResult {
    pub found: bool,
    pub handle: LeaderboardHandle,
}

/// Result of an entry download request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadResult {
    pub entries: EntriesHandle,
    pub count: usize,
}

/// Result of a user stats request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStatsResult {
    pub user: SubjectId,
    pub game: u64,
}

/// Result of a store request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreResult {
    pub ok: bool,
}

/// Service-level payload of a completed call
#[derive(Debug, Clone, PartialEq)]
pub enum CallPayload {
    LeaderboardFound(FindResult),
    EntriesDownloaded(DownloadResult),
    ScoreUploaded(UploadOutcome),
    UserStatsReceived(UserStatsResult),
    StatsStored(StoreResult),
    /// The transport broke before any service-level result existed
    Empty,
}

impl CallPayload {
    /// The kind of request this payload answers, if any
    pub fn kind(&self) -> Option<CallKind> {
        match self {
            CallPayload::LeaderboardFound(_) => Some(CallKind::FindLeaderboard),
            CallPayload::EntriesDownloaded(_) => Some(CallKind::DownloadEntries),
            CallPayload::ScoreUploaded(_) => Some(CallKind::UploadScore),
            CallPayload::UserStatsReceived(_) => Some(CallKind::RequestUserStats),
            CallPayload::StatsStored(_) => Some(CallKind::StoreStats),
            CallPayload::Empty => None,
        }
    }
}

/// A call the transport reports as finished
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCall {
    pub handle: CallHandle,
    /// Set when the call failed below the service level; `payload` is then meaningless
    pub io_failure: bool,
    pub payload: CallPayload,
}

/// Typed view of a [`CallPayload`], used when dispatching completions
pub trait FromPayload: Default + Send + 'static {
    /// The request kind this payload type answers
    const KIND: CallKind;

    /// Extract the typed result, or `None` if the payload answers another kind
    fn from_payload(payload: CallPayload) -> Option<Self>;
}

macro_rules! impl_from_payload {
    ($ty:ty, $variant:ident, $kind:expr) => {
        impl FromPayload for $ty {
            const KIND: CallKind = $kind;

            fn from_payload(payload: CallPayload) -> Option<Self> {
                match payload {
                    CallPayload::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

impl_from_payload!(FindResult, LeaderboardFound, CallKind::FindLeaderboard);
impl_from_payload!(DownloadResult, EntriesDownloaded, CallKind::DownloadEntries);
impl_from_payload!(UploadOutcome, ScoreUploaded, CallKind::UploadScore);
impl_from_payload!(UserStatsResult, UserStatsReceived, CallKind::RequestUserStats);
impl_from_payload!(StoreResult, StatsStored, CallKind::StoreStats);

/// One record of a downloaded entry set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub subject: SubjectId,
    pub score: i32,
    pub name: String,
}

/// Outcome of a synchronous image probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageProbe {
    Ready(AvatarImage),
    /// The image is still being fetched; probe again later
    NotReady,
    /// There is no image for this subject
    Unavailable,
}

/// The platform operations the reconciliation core consumes
pub trait PlatformService: Send + Sync {
    // Leaderboards

    /// Start looking up a leaderboard by name
    fn find_leaderboard(&self, name: &str) -> CallHandle;

    /// Start downloading an inclusive window of entries
    fn download_entries(
        &self,
        board: LeaderboardHandle,
        scope: RequestScope,
        range_start: i32,
        range_end: i32,
    ) -> CallHandle;

    /// Read one record of a completed download
    fn entry(&self, entries: EntriesHandle, index: usize) -> Option<RawEntry>;

    /// Start uploading a score
    fn upload_score(&self, board: LeaderboardHandle, method: UploadMethod, score: i32)
    -> CallHandle;

    /// Probe for a subject's avatar
    fn avatar(&self, subject: SubjectId) -> ImageProbe;

    // Achievements and stats

    /// Start fetching the current user's stats snapshot
    fn request_user_stats(&self) -> CallHandle;

    /// Unlock flag of an achievement; `None` if the service does not know the id
    /// or has not received stats yet
    fn achievement_flag(&self, id: &str) -> Option<bool>;

    /// Display attribute of an achievement (empty if unknown)
    fn achievement_attribute(&self, id: &str, field: AchievementField) -> String;

    /// Probe for an achievement's icon
    fn achievement_icon(&self, id: &str) -> ImageProbe;

    /// Integer stat value; `None` if unknown
    fn stat(&self, key: &str) -> Option<i32>;

    /// Set a stat locally; `false` if the key is unknown
    fn set_stat(&self, key: &str, value: i32) -> bool;

    /// Mark an achievement unlocked locally; `false` if unknown
    fn set_achievement(&self, id: &str) -> bool;

    /// Mark an achievement locked locally; `false` if unknown
    fn clear_achievement(&self, id: &str) -> bool;

    /// Show progress towards an achievement; `false` if unknown
    fn indicate_progress(&self, id: &str, current: u32, max: u32) -> bool;

    /// Start flushing local stats and achievements
    fn store_stats(&self) -> CallHandle;

    // Transport

    /// Drain calls that finished since the last poll (never blocks)
    fn poll_completed(&self) -> Vec<CompletedCall>;
}
