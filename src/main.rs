//! Scoring engine entry point.

use clap::Parser;

use scoring_engine::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, _logger) = cli::bootstrap(&cli)?;

    if let Err(err) = cli::run(cli, config).await {
        tracing::error!(error = %format!("{err:#}"), "scoring engine failed");
        return Err(err);
    }
    Ok(())
}
