use clap::Subcommand;

use super::config::ConfigArgs;
use super::generate::GenerateArgs;
use super::replay::ReplayArgs;
use super::resolve::ResolveArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Generate selectors for an element of a page snapshot
    Generate(GenerateArgs),

    /// Evaluate a selector against a page snapshot
    Resolve(ResolveArgs),

    /// Replay an action through recorded selectors with fallback
    Replay(ReplayArgs),

    /// Manage SoulSelector configuration
    Config(ConfigArgs),
}
