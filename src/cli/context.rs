use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use selector_gen::SelectorGenerator;

use crate::app_settings::AppConfig;
use crate::cli::output::OutputFormat;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Generator built from the loaded selector settings.
    pub fn generator(&self) -> Result<SelectorGenerator> {
        SelectorGenerator::new(self.config.selector.clone())
            .context("Invalid selector configuration")
    }
}
