//! Tick loop shared by the commands
//!
//! The commands run against the simulated platform. The loop ticks the
//! context on a `tokio` interval until the awaited completion fires.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use statsync::calls::Completion;
use statsync::config::{Config, Settings};
use statsync::service::MemoryService;
use statsync::{SyncContext, SyncEvent};

/// Build the simulated platform and a context over it
///
/// `extra_board` is created on the platform even when it is not configured.
pub fn simulated_context(
    config: &Config,
    extra_board: Option<&str>,
) -> (Arc<MemoryService>, SyncContext) {
    let boards = config
        .leaderboard
        .keys()
        .map(String::as_str)
        .chain(extra_board);
    let service = Arc::new(MemoryService::seeded(
        &config.simulation,
        boards,
        config.achievements.count,
    ));
    let context = SyncContext::new(service.clone(), config);
    (service, context)
}

fn ticker(settings: &Settings) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_millis(settings.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Tick the context until `completion` fires
pub async fn wait_for<T>(
    context: &mut SyncContext,
    settings: &Settings,
    mut completion: Completion<T>,
    what: &str,
) -> Result<T> {
    let mut ticker = ticker(settings);
    let mut ticks = 0;

    loop {
        tokio::select! {
            result = &mut completion => {
                debug!(what, ticks, "completion arrived");
                return result.map_err(|_| anyhow!("{} was abandoned", what));
            }
            _ = ticker.tick() => {
                if ticks >= settings.max_ticks {
                    bail!("Timed out waiting for {} after {} ticks", what, ticks);
                }
                ticks += 1;
                context.tick();
            }
        }
    }
}

/// Tick the context until `done` holds
pub async fn settle(
    context: &mut SyncContext,
    settings: &Settings,
    what: &str,
    mut done: impl FnMut(&SyncContext) -> bool,
) -> Result<()> {
    let mut ticker = ticker(settings);
    for _ in 0..settings.max_ticks {
        if done(context) {
            return Ok(());
        }
        ticker.tick().await;
        context.tick();
    }
    if done(context) {
        return Ok(());
    }
    bail!(
        "Timed out waiting for {} after {} ticks",
        what,
        settings.max_ticks
    )
}

/// Print events emitted since the last call
pub fn print_events(context: &SyncContext) {
    for SyncEvent { timestamp, kind } in context.drain_events() {
        println!("  {} {}", timestamp.format("%H:%M:%S%.3f"), kind);
    }
}
