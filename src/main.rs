use clap::Parser;

use stockpulse::adapter::inbound::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    execute(cli).await?;
    Ok(())
}
