//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::sync::SyncDomain;

/// Marketplace statistics sync with Telegram notifications
#[derive(Parser, Debug)]
#[command(name = "stockpulse")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot and the scheduler until interrupted
    Run,

    /// Poll one domain once and send notifications
    Sync(SyncArgs),

    /// Delete history older than the retention window
    Cleanup,

    /// Create or upgrade the database schema
    Migrate,
}

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// orders, sales, stocks, incomes or coefficients
    #[arg(long, value_parser = parse_domain)]
    pub domain: SyncDomain,
}

fn parse_domain(value: &str) -> Result<SyncDomain, String> {
    value.parse()
}
