use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

#[derive(Parser)]
#[command(name = "soulselector", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, default_value = "human", global = true)]
    pub output: crate::cli::output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
