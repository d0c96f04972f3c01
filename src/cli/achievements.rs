//! Achievements command implementation

use anyhow::{Context, Result};

use statsync::AchievementRecord;
use statsync::config::Config;

use super::runtime::{print_events, settle, simulated_context, wait_for};

/// Parse an `ID=VALUE` stat assignment
pub fn parse_stat_assignment(s: &str) -> Result<(String, i32), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{}'", s))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing achievement id in '{}'", s));
    }
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid stat value in '{}': {}", s, e))?;
    Ok((id.to_string(), value))
}

/// Refresh the catalog, apply mutations, flush them and print the result
pub async fn achievements_command(
    config: &Config,
    unlock: Vec<String>,
    set_stat: Vec<(String, i32)>,
    json: bool,
) -> Result<()> {
    let settings = config.settings.clone();
    let (_service, mut context) = simulated_context(config, None);

    let refresh = context.achievements().refresh();
    let summary = wait_for(&mut context, &settings, refresh, "user stats")
        .await?
        .context("Failed to refresh achievements")?;
    if !summary.failed.is_empty() && !json {
        println!(
            "Warning: no platform data for {}",
            summary.failed.join(", ")
        );
    }

    let store = context.achievements();
    for id in &unlock {
        store
            .unlock(id)
            .with_context(|| format!("Failed to unlock {}", id))?;
    }
    for (id, value) in &set_stat {
        store
            .set_stat(id, *value)
            .with_context(|| format!("Failed to set stat of {}", id))?;
    }

    // Ticking flushes dirty stats; the store then chains a refresh
    settle(&mut context, &settings, "stats flush", |c| {
        !c.achievements().is_dirty() && c.calls().in_flight() == 0
    })
    .await?;

    let records = context.achievements().snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("\nAchievements ({}):\n", records.len());
    print_records(&records);
    println!("\nEvents:");
    print_events(&context);
    Ok(())
}

pub fn print_records(records: &[AchievementRecord]) {
    for record in records {
        println!(
            "  {} [{}] stat={:<5} {}",
            record.id,
            if record.unlocked { "x" } else { " " },
            record.stat,
            if record.name.is_empty() {
                "(unreconciled)".to_string()
            } else {
                format!("{} - {}", record.name, record.description)
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_assignment() {
        assert_eq!(
            parse_stat_assignment("ACHIEVEMENT_01=5"),
            Ok(("ACHIEVEMENT_01".to_string(), 5))
        );
        assert_eq!(
            parse_stat_assignment(" ACHIEVEMENT_02 = -3 "),
            Ok(("ACHIEVEMENT_02".to_string(), -3))
        );
        assert!(parse_stat_assignment("ACHIEVEMENT_01").is_err());
        assert!(parse_stat_assignment("=4").is_err());
        assert!(parse_stat_assignment("ACHIEVEMENT_01=x").is_err());
    }
}
