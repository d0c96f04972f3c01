//! Demo command: a scripted end-to-end run against the simulated platform

use anyhow::{Context, Result};

use statsync::config::{Config, LeaderboardConfig};
use statsync::{RequestScope, UploadMethod, achievement_id};

use super::achievements::print_records;
use super::leaderboard::print_entries;
use super::runtime::{print_events, settle, simulated_context, wait_for};

const DEMO_BOARD: &str = "HighScores";

pub async fn demo_command(config: &Config) -> Result<()> {
    let settings = config.settings.clone();
    let (service, mut context) = simulated_context(config, Some(DEMO_BOARD));
    if context.leaderboard(DEMO_BOARD).is_none() {
        context.add_leaderboard(DEMO_BOARD, LeaderboardConfig::default());
    }

    println!("== Leaderboard '{}' ==\n", DEMO_BOARD);

    // A lookup that fails in transit leaves the board unresolved, so it is retried
    service.fail_next_calls(1);
    let board = context
        .leaderboard(DEMO_BOARD)
        .context("demo leaderboard missing")?;
    let first = board.resolve();
    if let Err(err) = wait_for(&mut context, &settings, first, "leaderboard lookup").await? {
        println!("First lookup failed: {}", err);
    }

    let board = context
        .leaderboard(DEMO_BOARD)
        .context("demo leaderboard missing")?;
    if let Err(err) = board.submit_score(100) {
        println!("Upload refused before resolution: {}", err);
    }
    let retry = board.resolve();
    wait_for(&mut context, &settings, retry, "leaderboard lookup")
        .await?
        .context("Failed to resolve demo leaderboard")?;

    for (score, method) in [
        (900, UploadMethod::KeepBest),
        (400, UploadMethod::KeepBest),
        (400, UploadMethod::ForceUpdate),
    ] {
        let upload = context
            .leaderboard(DEMO_BOARD)
            .context("demo leaderboard missing")?
            .submit_score_with(score, method)?;
        let outcome = wait_for(&mut context, &settings, upload, "score upload").await?;
        println!(
            "Submitted {:>4} with {:<12} -> stored {:>4}, changed {:<5}, rank {}",
            score, method, outcome.new_score, outcome.changed, outcome.new_rank
        );
    }

    for scope in [RequestScope::Global, RequestScope::GlobalAroundUser] {
        let (start, end) = match scope {
            RequestScope::GlobalAroundUser => (-1, 1),
            _ => (1, 10),
        };
        let download = context
            .leaderboard(DEMO_BOARD)
            .context("demo leaderboard missing")?
            .download_range(start, end, scope)?;
        let entries = wait_for(&mut context, &settings, download, "entry download")
            .await?
            .context("Failed to download entries")?;
        println!("\n{} {}..{}:", scope, start, end);
        print_entries(&entries);
    }

    println!("\n== Achievements ==\n");

    let refresh = context.achievements().refresh();
    wait_for(&mut context, &settings, refresh, "user stats")
        .await?
        .context("Failed to refresh achievements")?;

    let first = achievement_id(0);
    let second = achievement_id(1);
    let store = context.achievements();
    store.unlock(&first)?;
    store.set_stat(&second, 2)?;
    store.indicate_progress(&second, 2, 3)?;
    if let Err(err) = store.unlock("NOT_AN_ACHIEVEMENT") {
        println!("Unknown identity rejected: {}", err);
    }
    println!("get_stat on a miss returns {}", store.get_stat("NOT_AN_ACHIEVEMENT"));

    // The first store is rejected; the dirty flag keeps it queued for the next tick
    service.reject_next_stores(1);
    settle(&mut context, &settings, "stats flush", |c| {
        !c.achievements().is_dirty() && c.calls().in_flight() == 0
    })
    .await?;

    let records = context.achievements().snapshot();
    print_records(&records[..records.len().min(3)]);

    println!("\nEvents:");
    print_events(&context);
    Ok(())
}
