use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use statsync::config::Config;

mod cli;

#[derive(Parser)]
#[command(name = "statsync")]
#[command(about = "Leaderboard and achievement reconciliation against an asynchronous platform")]
#[command(version)]
struct Cli {
    /// Working directory used for config lookup (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to .statsync/config.toml, then ~/.statsync/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Resolve a leaderboard, optionally submit a score, and show its entries
    Leaderboard {
        /// Leaderboard name
        name: String,

        /// Score to submit before downloading
        #[arg(long, allow_hyphen_values = true)]
        score: Option<i32>,

        /// Overwrite the stored score even if it is better
        #[arg(long)]
        force_update: bool,

        /// Print the session snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the achievement catalog, apply changes and flush them
    Achievements {
        /// Unlock an achievement (repeatable)
        #[arg(long, value_name = "ID")]
        unlock: Vec<String>,

        /// Set a companion stat (repeatable)
        #[arg(
            long,
            value_name = "ID=VALUE",
            value_parser = cli::achievements::parse_stat_assignment
        )]
        set_stat: Vec<(String, i32)>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a scripted session against the simulated platform
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Determine the working directory
    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    let load_config = || Config::load(&work_dir, cli.config.as_deref());

    match cli.command {
        Some(Commands::Init { force }) => {
            cli::init::init_command(cli.config.clone(), force).await?;
        }
        Some(Commands::Leaderboard {
            name,
            score,
            force_update,
            json,
        }) => {
            let config = load_config()?;
            cli::leaderboard::leaderboard_command(&config, &name, score, force_update, json)
                .await?;
        }
        Some(Commands::Achievements {
            unlock,
            set_stat,
            json,
        }) => {
            let config = load_config()?;
            cli::achievements::achievements_command(&config, unlock, set_stat, json).await?;
        }
        Some(Commands::Demo) | None => {
            // Default: run the demo
            let config = load_config()?;
            cli::demo::demo_command(&config).await?;
        }
    }

    Ok(())
}
