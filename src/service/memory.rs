//! In-process simulated platform service
//!
//! Behaves like a remote platform driven by ticks: every asynchronous request
//! completes on a later [`PlatformService::poll_completed`] call, after a
//! configurable number of polls. Failures can be scripted (transport failures,
//! rejected stores, delayed images) so reconciliation can be exercised without
//! a real backend.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{
    CallPayload, CompletedCall, DownloadResult, FindResult, ImageProbe, PlatformService, RawEntry,
    StoreResult, UserStatsResult,
};
use crate::config::SimulationConfig;
use crate::domain::{
    AchievementField, AvatarImage, CallHandle, CallKind, EntriesHandle, LeaderboardHandle,
    RequestScope, SubjectId, UploadMethod, UploadOutcome, achievement_id, stat_key,
};

/// Application id reported in user stats results
const GAME_ID: u64 = 480;

/// Downloaded entry sets kept readable; older ones are released
const RETAINED_DOWNLOADS: u64 = 8;

/// How many requests of each kind were issued, and how many completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceCounters {
    pub finds: usize,
    pub downloads: usize,
    pub uploads: usize,
    pub user_stats: usize,
    pub stores: usize,
    pub completed: usize,
}

impl ServiceCounters {
    /// Total asynchronous requests issued
    pub fn issued(&self) -> usize {
        self.finds + self.downloads + self.uploads + self.user_stats + self.stores
    }
}

#[derive(Debug)]
struct Player {
    name: String,
    avatar: Option<AvatarImage>,
    /// Probes answered with `NotReady` before the avatar is delivered
    avatar_delay: u32,
}

#[derive(Debug)]
struct Board {
    handle: LeaderboardHandle,
    scores: Vec<(SubjectId, i32)>,
}

impl Board {
    /// Scores ordered best first; ties keep the lower subject id first
    fn ranked(&self) -> Vec<(SubjectId, i32)> {
        let mut ranked = self.scores.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    fn rank_of(&self, subject: SubjectId) -> Option<usize> {
        self.ranked()
            .iter()
            .position(|(s, _)| *s == subject)
            .map(|i| i + 1)
    }
}

#[derive(Debug)]
struct AchievementDef {
    name: String,
    description: String,
    unlocked: bool,
    icon: Option<AvatarImage>,
    icon_delay: u32,
}

#[derive(Debug)]
enum Operation {
    Find(String),
    Download {
        board: LeaderboardHandle,
        scope: RequestScope,
        range_start: i32,
        range_end: i32,
    },
    Upload {
        board: LeaderboardHandle,
        method: UploadMethod,
        score: i32,
    },
    UserStats,
    Store {
        ok: bool,
    },
}

#[derive(Debug)]
struct Scheduled {
    handle: CallHandle,
    ready_at: u64,
    io_failure: bool,
    operation: Operation,
}

#[derive(Debug)]
struct Inner {
    tick: u64,
    next_handle: u64,
    latency_ticks: u64,
    next_latency: Option<u64>,
    fail_next: usize,
    reject_stores: usize,
    scheduled: Vec<Scheduled>,
    injected: Vec<CompletedCall>,

    user: SubjectId,
    players: HashMap<SubjectId, Player>,
    friends: HashSet<SubjectId>,
    boards: HashMap<String, Board>,
    next_board: u64,
    downloads: HashMap<EntriesHandle, Vec<RawEntry>>,
    next_entries: u64,

    achievements: BTreeMap<String, AchievementDef>,
    stats: HashMap<String, i32>,
    stats_received: bool,
    committed: BTreeMap<String, (bool, i32)>,
    progress: Vec<(String, u32, u32)>,

    counters: ServiceCounters,
}

impl Inner {
    fn schedule(&mut self, kind: CallKind, operation: Operation) -> CallHandle {
        self.next_handle += 1;
        let handle = CallHandle(self.next_handle);
        let latency = self.next_latency.take().unwrap_or(self.latency_ticks);
        let io_failure = if self.fail_next > 0 {
            self.fail_next -= 1;
            true
        } else {
            false
        };

        match kind {
            CallKind::FindLeaderboard => self.counters.finds += 1,
            CallKind::DownloadEntries => self.counters.downloads += 1,
            CallKind::UploadScore => self.counters.uploads += 1,
            CallKind::RequestUserStats => self.counters.user_stats += 1,
            CallKind::StoreStats => self.counters.stores += 1,
        }
        debug!(%handle, %kind, latency, io_failure, "simulated request issued");

        self.scheduled.push(Scheduled {
            handle,
            ready_at: self.tick + latency.max(1),
            io_failure,
            operation,
        });
        handle
    }

    fn board_by_handle(&self, handle: LeaderboardHandle) -> Option<&Board> {
        self.boards.values().find(|b| b.handle == handle)
    }

    fn player_name(&self, subject: SubjectId) -> String {
        self.players
            .get(&subject)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("[unknown {}]", subject))
    }

    fn execute(&mut self, operation: Operation) -> CallPayload {
        match operation {
            Operation::Find(name) => match self.boards.get(&name) {
                Some(board) => CallPayload::LeaderboardFound(FindResult {
                    found: true,
                    handle: board.handle,
                }),
                None => CallPayload::LeaderboardFound(FindResult::default()),
            },
            Operation::Download {
                board,
                scope,
                range_start,
                range_end,
            } => {
                let rows = self.window(board, scope, range_start, range_end);
                self.next_entries += 1;
                let entries = EntriesHandle(self.next_entries);
                let count = rows.len();
                self.downloads.retain(|held, _| held.0 + RETAINED_DOWNLOADS > entries.0);
                self.downloads.insert(entries, rows);
                CallPayload::EntriesDownloaded(DownloadResult { entries, count })
            }
            Operation::Upload {
                board,
                method,
                score,
            } => CallPayload::ScoreUploaded(self.upload(board, method, score)),
            Operation::UserStats => {
                self.stats_received = true;
                CallPayload::UserStatsReceived(UserStatsResult {
                    user: self.user,
                    game: GAME_ID,
                })
            }
            Operation::Store { ok } => {
                if ok {
                    self.committed = self
                        .achievements
                        .iter()
                        .map(|(id, def)| {
                            let stat = self.stats.get(&stat_key(id)).copied().unwrap_or(0);
                            (id.clone(), (def.unlocked, stat))
                        })
                        .collect();
                }
                CallPayload::StatsStored(StoreResult { ok })
            }
        }
    }

    fn window(
        &self,
        board: LeaderboardHandle,
        scope: RequestScope,
        range_start: i32,
        range_end: i32,
    ) -> Vec<RawEntry> {
        let Some(board) = self.board_by_handle(board) else {
            return Vec::new();
        };
        let ranked = board.ranked();
        let to_entry = |(subject, score): &(SubjectId, i32)| RawEntry {
            subject: *subject,
            score: *score,
            name: self.player_name(*subject),
        };

        match scope {
            RequestScope::Global => {
                let start = range_start.max(1) as usize;
                let end = range_end.max(0) as usize;
                ranked
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| (start..=end).contains(&(i + 1)))
                    .map(|(_, row)| to_entry(row))
                    .collect()
            }
            RequestScope::GlobalAroundUser => {
                let Some(rank) = board.rank_of(self.user) else {
                    return Vec::new();
                };
                let rank = rank as i64;
                let start = rank + range_start as i64;
                let end = rank + range_end as i64;
                ranked
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| {
                        let r = *i as i64 + 1;
                        r >= start && r <= end
                    })
                    .map(|(_, row)| to_entry(row))
                    .collect()
            }
            RequestScope::Friends => ranked
                .iter()
                .filter(|(s, _)| *s == self.user || self.friends.contains(s))
                .map(to_entry)
                .collect(),
        }
    }

    fn upload(
        &mut self,
        handle: LeaderboardHandle,
        method: UploadMethod,
        score: i32,
    ) -> UploadOutcome {
        let user = self.user;
        let Some(board) = self.boards.values_mut().find(|b| b.handle == handle) else {
            return UploadOutcome::default();
        };

        let previous = board
            .scores
            .iter()
            .find(|(s, _)| *s == user)
            .map(|(_, score)| *score);

        let stored = match (method, previous) {
            (UploadMethod::KeepBest, Some(prev)) if prev >= score => prev,
            _ => score,
        };

        board.scores.retain(|(s, _)| *s != user);
        board.scores.push((user, stored));
        let new_rank = board.rank_of(user).unwrap_or(0) as i32;

        UploadOutcome {
            success: true,
            new_score: stored,
            changed: previous != Some(stored),
            new_rank,
        }
    }
}

/// Simulated platform service for demos and tests
#[derive(Debug)]
pub struct MemoryService {
    inner: Mutex<Inner>,
}

impl MemoryService {
    /// Create an empty service for the given local user
    pub fn new(user: SubjectId, user_name: impl Into<String>) -> Self {
        let mut players = HashMap::new();
        players.insert(
            user,
            Player {
                name: user_name.into(),
                avatar: None,
                avatar_delay: 0,
            },
        );

        Self {
            inner: Mutex::new(Inner {
                tick: 0,
                next_handle: 0,
                latency_ticks: 1,
                next_latency: None,
                fail_next: 0,
                reject_stores: 0,
                scheduled: Vec::new(),
                injected: Vec::new(),
                user,
                players,
                friends: HashSet::new(),
                boards: HashMap::new(),
                next_board: 0,
                downloads: HashMap::new(),
                next_entries: 0,
                achievements: BTreeMap::new(),
                stats: HashMap::new(),
                stats_received: false,
                committed: BTreeMap::new(),
                progress: Vec::new(),
                counters: ServiceCounters::default(),
            }),
        }
    }

    /// Build a populated world from simulation settings
    ///
    /// Every named leaderboard is seeded with the configured rival players,
    /// and achievements `0..=achievement_count` are defined with their stats.
    pub fn seeded<'a>(
        sim: &SimulationConfig,
        leaderboards: impl IntoIterator<Item = &'a str>,
        achievement_count: u32,
    ) -> Self {
        let user = SubjectId(1);
        let service = Self::new(user, sim.user.clone());
        service.set_latency(sim.latency_ticks);
        service.set_avatar(
            user,
            AvatarImage::solid(sim.avatar_size, sim.avatar_size, [40, 120, 200, 255]),
            sim.avatar_delay_probes,
        );

        for (i, rival) in sim.rivals.iter().enumerate() {
            let subject = SubjectId(i as u64 + 2);
            service.add_player(subject, rival.clone());
            service.set_avatar(
                subject,
                AvatarImage::solid(sim.avatar_size, sim.avatar_size, [200, 80, 40, 255]),
                sim.avatar_delay_probes,
            );
            if i % 2 == 0 {
                service.add_friend(subject);
            }
        }

        for name in leaderboards {
            service.add_leaderboard(name);
            for i in 0..sim.rivals.len() {
                let subject = SubjectId(i as u64 + 2);
                service.seed_score(name, subject, ((i as i32) + 1) * 250);
            }
        }

        for ordinal in 0..=achievement_count {
            let id = achievement_id(ordinal);
            service.define_achievement(
                &id,
                format!("Achievement {}", ordinal),
                format!("Reach milestone {}", ordinal),
            );
        }

        service
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================
    // WORLD SETUP
    // ========================================

    pub fn add_player(&self, subject: SubjectId, name: impl Into<String>) {
        self.lock().players.insert(
            subject,
            Player {
                name: name.into(),
                avatar: None,
                avatar_delay: 0,
            },
        );
    }

    pub fn add_friend(&self, subject: SubjectId) {
        self.lock().friends.insert(subject);
    }

    /// Give a player an avatar that is delivered after `delay_probes` `NotReady` answers
    pub fn set_avatar(&self, subject: SubjectId, image: AvatarImage, delay_probes: u32) {
        if let Some(player) = self.lock().players.get_mut(&subject) {
            player.avatar = Some(image);
            player.avatar_delay = delay_probes;
        }
    }

    /// Create a leaderboard; returns its handle (existing boards are kept)
    pub fn add_leaderboard(&self, name: &str) -> LeaderboardHandle {
        let mut inner = self.lock();
        if let Some(board) = inner.boards.get(name) {
            return board.handle;
        }
        inner.next_board += 1;
        let handle = LeaderboardHandle(inner.next_board);
        inner.boards.insert(
            name.to_string(),
            Board {
                handle,
                scores: Vec::new(),
            },
        );
        handle
    }

    /// Set a subject's stored score directly
    pub fn seed_score(&self, board: &str, subject: SubjectId, score: i32) {
        if let Some(board) = self.lock().boards.get_mut(board) {
            board.scores.retain(|(s, _)| *s != subject);
            board.scores.push((subject, score));
        }
    }

    /// Stored score of a subject
    pub fn score_of(&self, board: &str, subject: SubjectId) -> Option<i32> {
        self.lock()
            .boards
            .get(board)?
            .scores
            .iter()
            .find(|(s, _)| *s == subject)
            .map(|(_, score)| *score)
    }

    /// Define an achievement together with its companion stat
    pub fn define_achievement(
        &self,
        id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
    ) {
        let mut inner = self.lock();
        inner.achievements.insert(
            id.to_string(),
            AchievementDef {
                name: name.into(),
                description: description.into(),
                unlocked: false,
                icon: None,
                icon_delay: 0,
            },
        );
        inner.stats.insert(stat_key(id), 0);
    }

    pub fn set_icon(&self, id: &str, image: AvatarImage, delay_probes: u32) {
        if let Some(def) = self.lock().achievements.get_mut(id) {
            def.icon = Some(image);
            def.icon_delay = delay_probes;
        }
    }

    // ========================================
    // SCRIPTED BEHAVIOUR
    // ========================================

    /// Number of polls a request takes to complete (minimum 1)
    pub fn set_latency(&self, ticks: u64) {
        self.lock().latency_ticks = ticks;
    }

    /// Override the latency of the next issued request only
    pub fn delay_next(&self, ticks: u64) {
        self.lock().next_latency = Some(ticks);
    }

    /// Make the next `count` issued requests fail at the transport level
    pub fn fail_next_calls(&self, count: usize) {
        self.lock().fail_next += count;
    }

    /// Make the next `count` store requests answer `ok == false`
    pub fn reject_next_stores(&self, count: usize) {
        self.lock().reject_stores += count;
    }

    /// Report an arbitrary completion on the next poll
    pub fn inject_completion(&self, call: CompletedCall) {
        self.lock().injected.push(call);
    }

    // ========================================
    // INSPECTION
    // ========================================

    pub fn counters(&self) -> ServiceCounters {
        self.lock().counters
    }

    /// Number of polls performed so far
    pub fn tick(&self) -> u64 {
        self.lock().tick
    }

    /// Requests issued but not yet reported complete
    pub fn in_flight(&self) -> usize {
        self.lock().scheduled.len()
    }

    /// Unlock flag and stat value as of the last successful store
    pub fn committed(&self, id: &str) -> Option<(bool, i32)> {
        self.lock().committed.get(id).copied()
    }

    /// Progress indications received, in order
    pub fn progress_reports(&self) -> Vec<(String, u32, u32)> {
        self.lock().progress.clone()
    }
}

impl PlatformService for MemoryService {
    fn find_leaderboard(&self, name: &str) -> CallHandle {
        self.lock()
            .schedule(CallKind::FindLeaderboard, Operation::Find(name.to_string()))
    }

    fn download_entries(
        &self,
        board: LeaderboardHandle,
        scope: RequestScope,
        range_start: i32,
        range_end: i32,
    ) -> CallHandle {
        self.lock().schedule(
            CallKind::DownloadEntries,
            Operation::Download {
                board,
                scope,
                range_start,
                range_end,
            },
        )
    }

    fn entry(&self, entries: EntriesHandle, index: usize) -> Option<RawEntry> {
        self.lock().downloads.get(&entries)?.get(index).cloned()
    }

    fn upload_score(
        &self,
        board: LeaderboardHandle,
        method: UploadMethod,
        score: i32,
    ) -> CallHandle {
        self.lock().schedule(
            CallKind::UploadScore,
            Operation::Upload {
                board,
                method,
                score,
            },
        )
    }

    fn avatar(&self, subject: SubjectId) -> ImageProbe {
        let mut inner = self.lock();
        let Some(player) = inner.players.get_mut(&subject) else {
            return ImageProbe::Unavailable;
        };
        match &player.avatar {
            None => ImageProbe::Unavailable,
            Some(_) if player.avatar_delay > 0 => {
                player.avatar_delay -= 1;
                ImageProbe::NotReady
            }
            Some(image) => ImageProbe::Ready(image.clone()),
        }
    }

    fn request_user_stats(&self) -> CallHandle {
        self.lock()
            .schedule(CallKind::RequestUserStats, Operation::UserStats)
    }

    fn achievement_flag(&self, id: &str) -> Option<bool> {
        let inner = self.lock();
        if !inner.stats_received {
            return None;
        }
        inner.achievements.get(id).map(|def| def.unlocked)
    }

    fn achievement_attribute(&self, id: &str, field: AchievementField) -> String {
        let inner = self.lock();
        match (inner.achievements.get(id), field) {
            (Some(def), AchievementField::Name) => def.name.clone(),
            (Some(def), AchievementField::Description) => def.description.clone(),
            (None, _) => String::new(),
        }
    }

    fn achievement_icon(&self, id: &str) -> ImageProbe {
        let mut inner = self.lock();
        let Some(def) = inner.achievements.get_mut(id) else {
            return ImageProbe::Unavailable;
        };
        match &def.icon {
            None => ImageProbe::Unavailable,
            Some(_) if def.icon_delay > 0 => {
                def.icon_delay -= 1;
                ImageProbe::NotReady
            }
            Some(image) => ImageProbe::Ready(image.clone()),
        }
    }

    fn stat(&self, key: &str) -> Option<i32> {
        let inner = self.lock();
        if !inner.stats_received {
            return None;
        }
        inner.stats.get(key).copied()
    }

    fn set_stat(&self, key: &str, value: i32) -> bool {
        let mut inner = self.lock();
        if !inner.stats_received {
            return false;
        }
        match inner.stats.get_mut(key) {
            Some(stat) => {
                *stat = value;
                true
            }
            None => false,
        }
    }

    fn set_achievement(&self, id: &str) -> bool {
        let mut inner = self.lock();
        if !inner.stats_received {
            return false;
        }
        match inner.achievements.get_mut(id) {
            Some(def) => {
                def.unlocked = true;
                true
            }
            None => false,
        }
    }

    fn clear_achievement(&self, id: &str) -> bool {
        let mut inner = self.lock();
        if !inner.stats_received {
            return false;
        }
        match inner.achievements.get_mut(id) {
            Some(def) => {
                def.unlocked = false;
                true
            }
            None => false,
        }
    }

    fn indicate_progress(&self, id: &str, current: u32, max: u32) -> bool {
        let mut inner = self.lock();
        if !inner.achievements.contains_key(id) {
            return false;
        }
        inner.progress.push((id.to_string(), current, max));
        true
    }

    fn store_stats(&self) -> CallHandle {
        let mut inner = self.lock();
        let ok = if inner.reject_stores > 0 {
            inner.reject_stores -= 1;
            false
        } else {
            true
        };
        inner.schedule(CallKind::StoreStats, Operation::Store { ok })
    }

    fn poll_completed(&self) -> Vec<CompletedCall> {
        let mut inner = self.lock();
        inner.tick += 1;
        let now = inner.tick;

        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.scheduled)
            .into_iter()
            .partition(|s| s.ready_at <= now);
        inner.scheduled = pending;
        due.sort_by_key(|s| (s.ready_at, s.handle));

        let mut completed = std::mem::take(&mut inner.injected);
        for scheduled in due {
            let call = if scheduled.io_failure {
                CompletedCall {
                    handle: scheduled.handle,
                    io_failure: true,
                    payload: CallPayload::Empty,
                }
            } else {
                CompletedCall {
                    handle: scheduled.handle,
                    io_failure: false,
                    payload: inner.execute(scheduled.operation),
                }
            };
            completed.push(call);
        }

        inner.counters.completed += completed.len();
        completed
    }
}
