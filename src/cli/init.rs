//! Init command implementation

use anyhow::Result;
use std::path::{Path, PathBuf};

use statsync::config::Config;

/// Default configuration content for statsync init
pub const DEFAULT_CONFIG: &str = r#"# statsync configuration
# =======================
#
# Leaderboards and achievements are reconciled against the platform service
# once per tick. The CLI runs against a simulated platform described in
# [simulation].

# ============================================================================
# SETTINGS - Tick loop
# ============================================================================
#
# Available options:
#   tick_interval_ms - Milliseconds between ticks (default: 16)
#   max_ticks        - Ticks to wait for a result before giving up (default: 600)

[settings]
tick_interval_ms = 16
max_ticks = 600

# ============================================================================
# ACHIEVEMENTS
# ============================================================================
#
# The catalog holds count + 1 records: ACHIEVEMENT_00 .. ACHIEVEMENT_<count>.
# The platform must define achievements with exactly these names, each with a
# companion stat named <id>_STAT (e.g. ACHIEVEMENT_03_STAT).

[achievements]
count = 10

# ============================================================================
# LEADERBOARDS - One table per leaderboard name
# ============================================================================
#
# Available options:
#   range_start   - First rank of the download window (default: 1)
#   range_end     - Last rank of the download window, inclusive (default: 10)
#   scope         - "global", "global_around_user" or "friends" (default: "global")
#                   With global_around_user the range is relative to the user,
#                   e.g. -3..3. With friends the range is ignored.
#   upload_method - "keep_best" or "force_update" (default: "keep_best")

[leaderboard.HighScores]
range_start = 1
range_end = 10
scope = "global"
upload_method = "keep_best"

[leaderboard.Friends]
scope = "friends"

# ============================================================================
# SIMULATION - Behaviour of the simulated platform
# ============================================================================
#
# Available options:
#   latency_ticks       - Ticks each request takes to complete (default: 2)
#   avatar_delay_probes - "Not ready" answers before an avatar arrives (default: 1)
#   avatar_size         - Avatar edge length in pixels (default: 184)
#   user                - Display name of the local user (default: "player")
#   rivals              - Other players seeded on every leaderboard

[simulation]
latency_ticks = 2
avatar_delay_probes = 1
user = "player"
rivals = ["ada", "brook", "cyd", "dara", "eli"]
"#;

/// Write the default configuration
pub async fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    // Default to global config path
    let config_path = config_path.unwrap_or_else(Config::global_config_path);
    write_default_config(&config_path, force)?;
    println!("Created: {}", config_path.display());
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    Config::write_template(path, DEFAULT_CONFIG, force)
}
