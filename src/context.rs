//! Explicit owner of all reconciliation state
//!
//! A [`SyncContext`] bundles the service, the call registry, the achievement
//! store and one session per configured leaderboard. Independent contexts share
//! nothing, so several can coexist in one process.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use tracing::{debug, info};

use crate::achievements::AchievementStore;
use crate::calls::{CallRegistry, Completion};
use crate::config::{Config, LeaderboardConfig};
use crate::domain::{EventSink, StoreOutcome, SyncEvent};
use crate::leaderboard::LeaderboardSession;
use crate::service::PlatformService;

/// What one tick did
#[derive(Debug, Default)]
pub struct TickReport {
    /// Callbacks dispatched by the registry
    pub dispatched: usize,
    /// Store request issued this tick because stats were dirty
    pub flush: Option<Completion<StoreOutcome>>,
}

pub struct SyncContext {
    service: Arc<dyn PlatformService>,
    calls: CallRegistry,
    sink: EventSink,
    events: Receiver<SyncEvent>,
    achievements: AchievementStore,
    leaderboards: BTreeMap<String, LeaderboardSession>,
    ticks: u64,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("calls", &self.calls)
            .field("achievements", &self.achievements)
            .field("leaderboards", &self.leaderboards.keys().collect::<Vec<_>>())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl SyncContext {
    /// Build a context with a session for every configured leaderboard
    ///
    /// The achievement catalog is initialized from `config.achievements.count`;
    /// nothing is requested until the caller resolves or refreshes.
    pub fn new(service: Arc<dyn PlatformService>, config: &Config) -> Self {
        let calls = CallRegistry::new();
        let (sink, events) = EventSink::channel();
        let achievements = AchievementStore::new(service.clone(), calls.clone(), sink.clone());
        achievements.initialize(config.achievements.count);

        let mut context = Self {
            service,
            calls,
            sink,
            events,
            achievements,
            leaderboards: BTreeMap::new(),
            ticks: 0,
        };
        for (name, board) in &config.leaderboard {
            context.add_leaderboard(name, board.clone());
        }
        context
    }

    /// Add (or replace) the session for a leaderboard name
    pub fn add_leaderboard(
        &mut self,
        name: &str,
        config: LeaderboardConfig,
    ) -> &LeaderboardSession {
        let session = LeaderboardSession::new(
            name,
            config,
            self.service.clone(),
            self.calls.clone(),
            self.sink.clone(),
        );
        debug!(leaderboard = name, "leaderboard session added");
        // A replaced session abandons its calls as it drops
        self.leaderboards.insert(name.to_string(), session);
        &self.leaderboards[name]
    }

    /// Flush dirty stats, then dispatch every completed call
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let flush = self.achievements.flush_if_dirty();
        let dispatched = self.calls.pump(self.service.as_ref());
        TickReport { dispatched, flush }
    }

    /// Tick until `done` returns true, for at most `max_ticks` ticks
    ///
    /// Returns whether `done` was satisfied.
    pub fn run_until(&mut self, max_ticks: u64, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    pub fn leaderboard(&self, name: &str) -> Option<&LeaderboardSession> {
        self.leaderboards.get(name)
    }

    pub fn leaderboards(&self) -> impl Iterator<Item = (&String, &LeaderboardSession)> {
        self.leaderboards.iter()
    }

    pub fn achievements(&self) -> &AchievementStore {
        &self.achievements
    }

    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    pub fn service(&self) -> &Arc<dyn PlatformService> {
        &self.service
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Events emitted since the last drain, oldest first
    pub fn drain_events(&self) -> Vec<SyncEvent> {
        self.events.try_iter().collect()
    }

    /// Abandon everything still in flight; the context stays usable
    pub fn shutdown(&self) -> usize {
        let abandoned = self.achievements.shutdown()
            + self
                .leaderboards
                .values()
                .map(LeaderboardSession::shutdown)
                .sum::<usize>();
        info!(abandoned, "sync context shut down");
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::service::MemoryService;

    fn context() -> SyncContext {
        let mut config = Config::with_defaults();
        config.achievements.count = 2;
        let service = MemoryService::seeded(
            &SimulationConfig::default(),
            config.leaderboard.keys().map(String::as_str),
            config.achievements.count,
        );
        SyncContext::new(Arc::new(service), &config)
    }

    #[test]
    fn test_sessions_follow_config() {
        let ctx = context();
        assert!(ctx.leaderboard("HighScores").is_some());
        assert!(ctx.leaderboard("Other").is_none());
        assert_eq!(ctx.achievements().len(), 3);
    }

    #[test]
    fn test_tick_flushes_dirty_stats() {
        let mut ctx = context();
        let _ = ctx.achievements().refresh();
        assert!(ctx.run_until(10, |c| {
            !c.achievements().record("ACHIEVEMENT_00").unwrap().name.is_empty()
        }));

        ctx.achievements().unlock("ACHIEVEMENT_01").unwrap();
        let report = ctx.tick();
        assert!(report.flush.is_some());
        assert!(ctx.run_until(10, |c| !c.achievements().is_dirty()));
    }

    #[test]
    fn test_resolve_through_context() {
        let mut ctx = context();
        let mut resolved = ctx.leaderboard("HighScores").unwrap().resolve();
        assert!(ctx.run_until(10, |c| c.leaderboard("HighScores").unwrap().is_resolved()));
        assert!(resolved.try_take().unwrap().is_ok());
        assert!(!ctx.drain_events().is_empty());
    }

    #[test]
    fn test_shutdown_abandons_everything() {
        let ctx = context();
        let _ = ctx.achievements().refresh();
        let _ = ctx.leaderboard("HighScores").unwrap().resolve();
        assert_eq!(ctx.calls().in_flight(), 2);
        assert_eq!(ctx.shutdown(), 2);
        assert_eq!(ctx.calls().in_flight(), 0);
    }
}
