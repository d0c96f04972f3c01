use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

use super::{CallKind, UploadOutcome};

/// What happened during reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SyncEventKind {
    /// A leaderboard name resolved to a service handle
    LeaderboardResolved { leaderboard: String },
    /// The service answered a find request without a leaderboard
    LeaderboardNotFound { leaderboard: String },
    /// A download completed and its entries were materialized
    EntriesReady { leaderboard: String, count: usize },
    /// A score upload completed
    ScoreUploaded {
        leaderboard: String,
        outcome: UploadOutcome,
    },
    /// The achievement catalog was reconciled with the service
    StatsRefreshed { updated: usize, failed: usize },
    /// A stats flush completed
    StatsStored { ok: bool },
    /// Progress towards an achievement was reported (`max == 0` means unlocked)
    AchievementProgress { id: String, current: u32, max: u32 },
    /// A call failed at the transport level before producing a result
    IoFailure { operation: CallKind },
}

impl std::fmt::Display for SyncEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEventKind::LeaderboardResolved { leaderboard } => {
                write!(f, "leaderboard '{}' resolved", leaderboard)
            }
            SyncEventKind::LeaderboardNotFound { leaderboard } => {
                write!(f, "leaderboard '{}' not found", leaderboard)
            }
            SyncEventKind::EntriesReady { leaderboard, count } => {
                write!(f, "leaderboard '{}': {} entries ready", leaderboard, count)
            }
            SyncEventKind::ScoreUploaded {
                leaderboard,
                outcome,
            } => write!(
                f,
                "leaderboard '{}': upload success={} score={} changed={} rank={}",
                leaderboard, outcome.success, outcome.new_score, outcome.changed, outcome.new_rank
            ),
            SyncEventKind::StatsRefreshed { updated, failed } => {
                write!(f, "stats refreshed ({} updated, {} failed)", updated, failed)
            }
            SyncEventKind::StatsStored { ok } => write!(f, "stats stored ok={}", ok),
            SyncEventKind::AchievementProgress { id, current, max } => {
                if *max == 0 {
                    write!(f, "achievement {} unlocked", id)
                } else {
                    write!(f, "achievement {} progress {}/{}", id, current, max)
                }
            }
            SyncEventKind::IoFailure { operation } => write!(f, "io failure during {}", operation),
        }
    }
}

/// A timestamped reconciliation event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: SyncEventKind,
}

impl SyncEvent {
    pub fn new(kind: SyncEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Sending half of the event stream, shared by sessions and stores
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<SyncEvent>,
}

impl EventSink {
    /// Create a sink together with the receiver that observes it
    pub fn channel() -> (Self, Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// Emit an event; a dropped receiver is not an error
    pub fn emit(&self, kind: SyncEventKind) {
        let _ = self.tx.send(SyncEvent::new(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_receiver() {
        let (sink, rx) = EventSink::channel();
        sink.emit(SyncEventKind::StatsStored { ok: true });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, SyncEventKind::StatsStored { ok: true });
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(SyncEventKind::StatsRefreshed {
            updated: 1,
            failed: 0,
        });
    }

    #[test]
    fn test_progress_display() {
        let unlocked = SyncEventKind::AchievementProgress {
            id: "ACHIEVEMENT_01".to_string(),
            current: 0,
            max: 0,
        };
        assert_eq!(unlocked.to_string(), "achievement ACHIEVEMENT_01 unlocked");
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = SyncEvent::new(SyncEventKind::IoFailure {
            operation: CallKind::StoreStats,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "io_failure");
        assert_eq!(json["operation"], "store_stats");
    }
}
