//! CLI command implementations

pub mod achievements;
pub mod demo;
pub mod init;
pub mod leaderboard;
pub mod runtime;
