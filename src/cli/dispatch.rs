use super::config::cmd_config;
use super::env::CliArgs;
use super::generate::cmd_generate;
use super::replay::cmd_replay;
use super::resolve::cmd_resolve;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Generate(args) => cmd_generate(args, ctx).await,
        Commands::Resolve(args) => cmd_resolve(args, ctx).await,
        Commands::Replay(args) => cmd_replay(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
