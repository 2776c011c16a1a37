//! Application settings loaded from `config.yaml`

use std::path::Path;

use anyhow::{Context, Result};
use selector_gen::SelectorConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Record-time generation settings
    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

impl AppConfig {
    /// Reject settings the generator would refuse.
    pub fn validate(&self) -> Result<(), selector_gen::GenerateError> {
        self.selector.validate()
    }

    /// Read `path`; `None` when the file does not exist.
    pub async fn read(path: &Path) -> Result<Option<Self>> {
        if !fs::try_exists(path).await? {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config =
            serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    /// Validate, then write `path` as YAML, creating parent directories.
    pub async fn write(&self, path: &Path) -> Result<()> {
        self.validate()
            .with_context(|| format!("refusing to write invalid settings to {}", path.display()))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, serde_yaml::to_string(self)?)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayConfig {
    /// Regenerate selectors from the level map when none were recorded.
    /// Default: true
    #[serde(default = "default_allow_regenerate")]
    pub allow_regenerate: bool,

    /// Deadline for one replayed action, all attempts included.
    /// Default: 30000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_allow_regenerate() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            allow_regenerate: default_allow_regenerate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "selector:\n  buryingPoint: data-track\nreplay:\n  timeoutMs: 500\n",
        )
        .unwrap();
        assert_eq!(config.selector.burying_point.as_deref(), Some("data-track"));
        assert_eq!(config.selector.max_depth, 6);
        assert!(config.replay.allow_regenerate);
        assert_eq!(config.replay.timeout_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        assert_eq!(AppConfig::read(&path).await.unwrap(), None);

        let mut config = AppConfig::default();
        config.replay.timeout_ms = 1_000;
        config.write(&path).await.unwrap();
        assert_eq!(AppConfig::read(&path).await.unwrap(), Some(config.clone()));

        config.selector.max_results = 0;
        assert!(config.write(&path).await.is_err());
    }
}
