use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{config_path, init_logging, load_config};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting SoulSelector v{}", env!("CARGO_PKG_VERSION"));

    let path = config_path(cli.config.as_ref())?;
    // `config` repairs broken files, so it must start without one.
    let config = load_config(&path, matches!(cli.command, Commands::Config(_))).await?;
    let cli_context = CliContext::new(config, path, cli.output);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
