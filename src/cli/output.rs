use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print `value` as JSON or YAML, or the `human` rendering.
    pub fn emit<T: Serialize>(self, value: &T, human: impl FnOnce() -> String) -> Result<()> {
        match self {
            OutputFormat::Human => println!("{}", human()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        }
        Ok(())
    }
}
