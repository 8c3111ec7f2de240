//! ChainLive CLI — drive the realtime stores from captured subscription feeds.
//!
//! # Commands
//! ```text
//! chainlive replay  --file <feed.jsonl> [--config <cfg.json>] [--log-address <addr>]... [--json]
//! chainlive config
//! chainlive info
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chainlive_cli::{init_tracing, replay, LogConfig};
use chainlive_core::{config as defaults, LogFilter, StoreConfig};

#[derive(Parser)]
#[command(
    name = "chainlive",
    about = "Realtime chain, consensus and log state for block explorers",
    long_about = "
ChainLive CLI: replay JSON-lines subscription captures through the realtime
stores and report the resulting chain, consensus and log state.

ENVIRONMENT VARIABLES:
  RUST_LOG    Log filter directives (overrides --log-level)
",
    version
)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit structured JSON logs on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured feed and print the final store state
    Replay {
        /// JSON-lines capture: {"topic": ..., "payload": ..., "at": <ms>?}
        #[arg(short, long)]
        file: PathBuf,
        /// Store configuration (JSON). Missing fields take defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Open a log subscription for these contract addresses (repeatable)
        #[arg(long = "log-address")]
        log_addresses: Vec<String>,
        /// Open a log subscription that keeps every log
        #[arg(long, conflicts_with = "log_addresses")]
        all_logs: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default store configuration as JSON
    Config,

    /// Show ChainLive defaults
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    match cli.command {
        Commands::Replay {
            file,
            config,
            log_addresses,
            all_logs,
            json,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => StoreConfig::default(),
            };
            let filter = if all_logs {
                Some(LogFilter::default())
            } else if log_addresses.is_empty() {
                None
            } else {
                Some(LogFilter {
                    addresses: log_addresses,
                    topics: Vec::new(),
                })
            };

            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("cannot open {}", file.display()))?,
            );
            let report = replay(reader, &config, filter).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&StoreConfig::default())?);
        }
        Commands::Info => cmd_info(),
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<StoreConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: StoreConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn cmd_info() {
    println!("ChainLive v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Chain store: {} blocks, {} transactions, {} pending",
        defaults::RECENT_BLOCKS,
        defaults::RECENT_TRANSACTIONS,
        defaults::PENDING_TRANSACTIONS
    );
    println!(
        "  Consensus store: {} blocks, {} errors, {} forks, {} validator changes",
        defaults::MAX_RECENT_BLOCKS,
        defaults::MAX_RECENT_ERRORS,
        defaults::MAX_RECENT_FORKS,
        defaults::MAX_RECENT_VALIDATOR_CHANGES
    );
    println!("  Log store: {} logs per subscription", defaults::LOG_CAPACITY);
    println!(
        "  Pending TTL: {} s, checked every {} s",
        defaults::PENDING_TTL_MS / 1_000,
        defaults::EXPIRY_INTERVAL_MS / 1_000
    );
    println!("  Health tiers: excellent >= 90, good >= 75, degraded >= 50, else critical");
}
