use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app_settings::AppConfig;

/// Directory under the platform config dir holding `config.yaml`.
pub const APP_DIR: &str = "soulselector";

/// Project-local settings, preferred over the per-user file.
pub const LOCAL_CONFIG: &str = "config/config.yaml";

/// `RUST_LOG` wins; otherwise `--log-level`, or debug with `--debug`.
fn log_filter(level: &str, debug: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level: tracing::Level = if debug {
        tracing::Level::DEBUG
    } else {
        level
            .parse()
            .with_context(|| format!("invalid log level {}", level))?
    };
    Ok(EnvFilter::new(level.to_string()))
}

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    // stderr keeps JSON/YAML on stdout parseable.
    tracing_subscriber::registry()
        .with(log_filter(level, debug)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

/// Explicit path, then [`LOCAL_CONFIG`], then the per-user config dir.
pub fn config_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let dir = dirs::config_dir().context("no per-user config directory on this platform")?;
    Ok(dir.join(APP_DIR).join("config.yaml"))
}

/// Settings for this run. A missing file means defaults; with
/// `tolerate_errors` an unreadable one does too.
pub async fn load_config(path: &Path, tolerate_errors: bool) -> Result<AppConfig> {
    match AppConfig::read(path).await {
        Ok(Some(config)) => {
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Ok(None) => {
            warn!("No configuration at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(err) if tolerate_errors => {
            warn!("Ignoring unreadable configuration: {:#}", err);
            Ok(AppConfig::default())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/elsewhere.yaml");
        assert_eq!(config_path(Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn log_level_must_parse() {
        std::env::remove_var("RUST_LOG");
        assert!(log_filter("warn", false).is_ok());
        assert!(log_filter("chatty", true).is_ok());
        assert!(log_filter("chatty", false).is_err());
    }

    #[tokio::test]
    async fn broken_file_is_fatal_unless_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(load_config(&path, false).await.unwrap(), AppConfig::default());

        std::fs::write(&path, "selector: [").unwrap();
        assert!(load_config(&path, false).await.is_err());
        assert_eq!(load_config(&path, true).await.unwrap(), AppConfig::default());
    }
}
