//! Leaderboard command implementation

use anyhow::{Context, Result};
use tracing::info;

use statsync::config::Config;
use statsync::leaderboard::LeaderboardSession;
use statsync::{LeaderboardEntry, SyncContext, UploadMethod};

use super::runtime::{print_events, settle, simulated_context, wait_for};

fn session<'a>(context: &'a SyncContext, name: &str) -> Result<&'a LeaderboardSession> {
    context
        .leaderboard(name)
        .with_context(|| format!("No session for leaderboard '{}'", name))
}

/// Resolve a leaderboard, optionally submit a score, then download and print it
pub async fn leaderboard_command(
    config: &Config,
    name: &str,
    score: Option<i32>,
    force_update: bool,
    json: bool,
) -> Result<()> {
    let settings = config.settings.clone();
    let (_service, mut context) = simulated_context(config, Some(name));
    if context.leaderboard(name).is_none() {
        info!(leaderboard = name, "leaderboard not configured; using defaults");
        context.add_leaderboard(name, Default::default());
    }

    let resolved = session(&context, name)?.resolve();
    wait_for(&mut context, &settings, resolved, "leaderboard lookup")
        .await?
        .with_context(|| format!("Failed to resolve leaderboard '{}'", name))?;

    if let Some(score) = score {
        let board = session(&context, name)?;
        let method = if force_update {
            UploadMethod::ForceUpdate
        } else {
            board.config().upload_method
        };
        let upload = board.submit_score_with(score, method)?;
        let outcome = wait_for(&mut context, &settings, upload, "score upload").await?;
        if !json {
            println!(
                "Uploaded {} ({}): stored {}, rank {}{}",
                score,
                method,
                outcome.new_score,
                outcome.new_rank,
                if outcome.changed { "" } else { " (unchanged)" }
            );
        }
    }

    let download = session(&context, name)?.download()?;
    wait_for(&mut context, &settings, download, "entry download")
        .await?
        .with_context(|| format!("Failed to download leaderboard '{}'", name))?;
    settle(&mut context, &settings, "pending calls", |c| {
        c.calls().in_flight() == 0
    })
    .await?;

    let snapshot = session(&context, name)?.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "\nLeaderboard '{}' ({} entries):\n",
        snapshot.identity.name,
        snapshot.entries.len()
    );
    print_entries(&snapshot.entries);
    println!("\nEvents:");
    print_events(&context);
    Ok(())
}

pub fn print_entries(entries: &[LeaderboardEntry]) {
    if entries.is_empty() {
        println!("  No entries.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let avatar = match &entry.avatar {
            Some(image) => format!("{}x{}", image.width, image.height),
            None => "-".to_string(),
        };
        println!(
            "  {:>3}. {:<16} {:>8}  avatar {}",
            i + 1,
            entry.name,
            entry.score,
            avatar
        );
    }
}
