//! statsync - asynchronous leaderboard and achievement reconciliation
//!
//! statsync keeps local leaderboard and achievement state consistent with a
//! remote platform service whose operations complete asynchronously.
//!
//! ## Model
//!
//! Every platform request returns a call handle at once. A [`calls::CallRegistry`]
//! correlates handles with their completion callbacks, and the owner pumps it
//! once per tick so results land at a well-defined point. Issuing operations
//! hand back a [`calls::Completion`], which can be polled after a tick or
//! awaited.
//!
//! All state lives in an explicit [`SyncContext`]: one
//! [`leaderboard::LeaderboardSession`] per named leaderboard and a single
//! [`achievements::AchievementStore`].

pub mod achievements;
pub mod calls;
pub mod config;
pub mod context;
pub mod domain;
pub mod leaderboard;
pub mod service;

pub use context::{SyncContext, TickReport};
pub use domain::*;
