use serde::{Deserialize, Serialize};

/// Service-side handle of a resolved leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LeaderboardHandle(pub u64);

/// Service-side handle of a downloaded entry set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntriesHandle(pub u64);

/// Opaque identity of a ranked subject (a player account)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SubjectId(pub u64);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolution state of a named leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    /// No find request has completed yet
    #[default]
    Unresolved,
    /// A find request is in flight
    Resolving,
    /// The service returned a handle for the name
    Resolved,
    /// The service answered, but has no leaderboard with that name
    NotFound,
}

impl std::fmt::Display for ResolveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveState::Unresolved => write!(f, "unresolved"),
            ResolveState::Resolving => write!(f, "resolving"),
            ResolveState::Resolved => write!(f, "resolved"),
            ResolveState::NotFound => write!(f, "not_found"),
        }
    }
}

/// Resolved identity of a named leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardIdentity {
    /// Name the leaderboard is looked up by
    pub name: String,

    /// Service handle, present only once resolved
    pub handle: Option<LeaderboardHandle>,

    /// Where resolution currently stands
    pub state: ResolveState,
}

impl LeaderboardIdentity {
    /// Create an unresolved identity for a leaderboard name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
            state: ResolveState::Unresolved,
        }
    }

    /// The handle, if (and only if) the identity is resolved
    pub fn resolved_handle(&self) -> Option<LeaderboardHandle> {
        match self.state {
            ResolveState::Resolved => self.handle,
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_handle().is_some()
    }
}

/// Which population of entries a download targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestScope {
    /// Absolute ranks `range_start..=range_end` (1-based)
    #[default]
    Global,
    /// Ranks relative to the requesting user, e.g. `-3..=3`
    GlobalAroundUser,
    /// The requesting user and their friends; the range is ignored
    Friends,
}

impl RequestScope {
    /// Parse a scope from a string (supports short aliases)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "g" | "global" => Some(RequestScope::Global),
            "u" | "around" | "around_user" | "global_around_user" => {
                Some(RequestScope::GlobalAroundUser)
            }
            "f" | "friends" => Some(RequestScope::Friends),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestScope::Global => "global",
            RequestScope::GlobalAroundUser => "global_around_user",
            RequestScope::Friends => "friends",
        }
    }
}

impl std::fmt::Display for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an uploaded score is merged with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMethod {
    /// Keep the stored score unless the new one is better
    #[default]
    KeepBest,
    /// Always overwrite the stored score
    ForceUpdate,
}

impl std::fmt::Display for UploadMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadMethod::KeepBest => write!(f, "keep_best"),
            UploadMethod::ForceUpdate => write!(f, "force_update"),
        }
    }
}

/// Result of a score submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Whether the service accepted the upload
    pub success: bool,
    /// The score now stored for the user
    pub new_score: i32,
    /// Whether the stored score changed
    pub changed: bool,
    /// The user's global rank after the upload (1-based)
    pub new_rank: i32,
}

/// RGBA avatar or icon image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels; omitted from serialized snapshots
    #[serde(skip)]
    pub rgba: Vec<u8>,
}

impl AvatarImage {
    /// Create an image, returning `None` when the pixel buffer does not match the size
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = 4usize * width as usize * height as usize;
        if rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    /// A single-colour image, handy for placeholders
    pub fn solid(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let rgba = pixel
            .iter()
            .copied()
            .cycle()
            .take(4 * width as usize * height as usize)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }
}

/// One ranked record of a downloaded leaderboard window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Identity of the ranked subject
    pub subject: SubjectId,
    /// Display name of the subject
    pub name: String,
    pub score: i32,
    /// Best-effort avatar; absent when the image was not delivered in time
    pub avatar: Option<AvatarImage>,
}
