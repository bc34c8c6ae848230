//! Subcommand execution.

use tracing::info;

use super::command::{Cli, Commands};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Load the configuration, start logging and run the chosen subcommand.
///
/// # Errors
/// Returns configuration, database and runtime errors from the subcommand.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    config.init_logging();
    info!(config = %cli.config.display(), command = ?cli.command, "stockpulse starting");

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Sync(args) => sync(&config, args.domain).await,
        Commands::Cleanup => {
            let report = bootstrap::cleanup(&config).await?;
            println!(
                "deleted {} orders, {} sales, {} report rows{}",
                report.orders_deleted,
                report.sales_deleted,
                report.report_lines_deleted,
                if report.timed_out {
                    " (time limit reached)"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Commands::Migrate => {
            bootstrap::open_store(&config)?;
            println!("database ready: {}", config.database);
            Ok(())
        }
    }
}

#[cfg(feature = "telegram")]
async fn run(config: Config) -> Result<()> {
    bootstrap::run(config).await
}

#[cfg(not(feature = "telegram"))]
async fn run(_config: Config) -> Result<()> {
    Err(crate::error::ConfigError::Other(
        "`run` requires the telegram feature".to_string(),
    )
    .into())
}

#[cfg(feature = "telegram")]
async fn sync(config: &Config, domain: crate::application::sync::SyncDomain) -> Result<()> {
    let report = bootstrap::sync_once(config, domain).await?;
    println!(
        "{domain}: {} delivered, {} failed",
        report.delivered, report.failed
    );
    Ok(())
}

#[cfg(not(feature = "telegram"))]
async fn sync(_config: &Config, _domain: crate::application::sync::SyncDomain) -> Result<()> {
    Err(crate::error::ConfigError::Other(
        "`sync` requires the telegram feature".to_string(),
    )
    .into())
}
