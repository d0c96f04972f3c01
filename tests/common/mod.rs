//! Shared fixtures for reconciliation tests

#![allow(dead_code)]

use std::sync::Arc;

use statsync::SyncContext;
use statsync::calls::Completion;
use statsync::config::{Config, LeaderboardConfig};
use statsync::service::MemoryService;
use statsync::{SubjectId, achievement_id};

pub const BOARD: &str = "HighScores";
pub const ME: SubjectId = SubjectId(1);
pub const ALICE: SubjectId = SubjectId(2);
pub const BOB: SubjectId = SubjectId(3);
pub const CARA: SubjectId = SubjectId(4);

/// A context over a small simulated world
///
/// Board `HighScores` holds alice 900, bob 600, cara 300; the local user has
/// no score yet. Bob is a friend. Achievements 00..=03 are defined.
pub struct Harness {
    pub service: Arc<MemoryService>,
    pub context: SyncContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config(3))
    }

    pub fn with_config(config: Config) -> Self {
        let service = Arc::new(MemoryService::new(ME, "me"));
        service.add_player(ALICE, "alice");
        service.add_player(BOB, "bob");
        service.add_player(CARA, "cara");
        service.add_friend(BOB);

        service.add_leaderboard(BOARD);
        service.seed_score(BOARD, ALICE, 900);
        service.seed_score(BOARD, BOB, 600);
        service.seed_score(BOARD, CARA, 300);

        for ordinal in 0..=3 {
            let id = achievement_id(ordinal);
            service.define_achievement(&id, format!("Title {ordinal}"), format!("About {ordinal}"));
        }

        let context = SyncContext::new(service.clone(), &config);
        Self { service, context }
    }

    /// Tick until `completion` fires, failing the test after 20 ticks
    pub fn complete<T>(&mut self, mut completion: Completion<T>) -> T {
        for _ in 0..20 {
            if let Some(value) = completion.try_take() {
                return value;
            }
            self.context.tick();
        }
        completion
            .try_take()
            .expect("completion did not fire within 20 ticks")
    }

    /// Resolve the default board and return once it is resolved
    pub fn resolved(mut self) -> Self {
        let resolve = self.context.leaderboard(BOARD).unwrap().resolve();
        self.complete(resolve).expect("board resolves");
        self
    }

    /// Refresh achievements and return once stats are received
    pub fn refreshed(mut self) -> Self {
        let refresh = self.context.achievements().refresh();
        self.complete(refresh).expect("stats refresh");
        self
    }
}

pub fn config(achievement_count: u32) -> Config {
    let mut config = Config::default();
    config.achievements.count = achievement_count;
    config
        .leaderboard
        .insert(BOARD.to_string(), LeaderboardConfig::default());
    config
}
