use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use crate::app_settings::AppConfig;
use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the settings file, or defaults when it is missing
    Show,

    /// Set one setting and write the file
    Set {
        /// Setting key, e.g. `selector.maxDepth`
        key: ConfigKey,

        /// New value; lists take `a,b` or a JSON array, `none` clears buryingPoint
        value: String,
    },

    /// Print one setting
    Get {
        /// Setting key, e.g. `replay.timeoutMs`
        key: ConfigKey,
    },

    /// List every settable key with its current value
    Keys,

    /// Write the defaults
    Reset,

    /// Check the settings file
    Validate,
}

/// Settable keys of [`AppConfig`], spelled as they appear in `config.yaml`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKey {
    BuryingPoint,
    ExcludeClass,
    ExcludeClassModify,
    ExcludeAttr,
    ExcludeIdByVal,
    MaxDepth,
    MaxResults,
    MaxAttrCandidates,
    AllowRegenerate,
    TimeoutMs,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 10] = [
        ConfigKey::BuryingPoint,
        ConfigKey::ExcludeClass,
        ConfigKey::ExcludeClassModify,
        ConfigKey::ExcludeAttr,
        ConfigKey::ExcludeIdByVal,
        ConfigKey::MaxDepth,
        ConfigKey::MaxResults,
        ConfigKey::MaxAttrCandidates,
        ConfigKey::AllowRegenerate,
        ConfigKey::TimeoutMs,
    ];

    pub fn path(self) -> &'static str {
        match self {
            ConfigKey::BuryingPoint => "selector.buryingPoint",
            ConfigKey::ExcludeClass => "selector.excludeClass",
            ConfigKey::ExcludeClassModify => "selector.excludeClassModify",
            ConfigKey::ExcludeAttr => "selector.excludeAttr",
            ConfigKey::ExcludeIdByVal => "selector.excludeIdByVal",
            ConfigKey::MaxDepth => "selector.maxDepth",
            ConfigKey::MaxResults => "selector.maxResults",
            ConfigKey::MaxAttrCandidates => "selector.maxAttrCandidates",
            ConfigKey::AllowRegenerate => "replay.allowRegenerate",
            ConfigKey::TimeoutMs => "replay.timeoutMs",
        }
    }

    pub fn get(self, config: &AppConfig) -> String {
        let selector = &config.selector;
        match self {
            ConfigKey::BuryingPoint => selector
                .burying_point
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            ConfigKey::ExcludeClass => selector.exclude_class.join(","),
            ConfigKey::ExcludeClassModify => selector.exclude_class_modify.clone(),
            ConfigKey::ExcludeAttr => selector.exclude_attr.clone(),
            ConfigKey::ExcludeIdByVal => selector.exclude_id_by_val.clone(),
            ConfigKey::MaxDepth => selector.max_depth.to_string(),
            ConfigKey::MaxResults => selector.max_results.to_string(),
            ConfigKey::MaxAttrCandidates => selector.max_attr_candidates.to_string(),
            ConfigKey::AllowRegenerate => config.replay.allow_regenerate.to_string(),
            ConfigKey::TimeoutMs => config.replay.timeout_ms.to_string(),
        }
    }

    /// Parse `raw` for this key and store it; limits are checked by
    /// [`AppConfig::validate`] afterwards.
    pub fn set(self, config: &mut AppConfig, raw: &str) -> Result<()> {
        let selector = &mut config.selector;
        match self {
            ConfigKey::BuryingPoint => {
                let raw = raw.trim();
                selector.burying_point =
                    (!raw.is_empty() && raw != "none").then(|| raw.to_string());
            }
            ConfigKey::ExcludeClass => selector.exclude_class = parse_list(raw)?,
            ConfigKey::ExcludeClassModify => selector.exclude_class_modify = raw.to_string(),
            ConfigKey::ExcludeAttr => selector.exclude_attr = raw.to_string(),
            ConfigKey::ExcludeIdByVal => selector.exclude_id_by_val = raw.to_string(),
            ConfigKey::MaxDepth => selector.max_depth = parse_number(self, raw)?,
            ConfigKey::MaxResults => selector.max_results = parse_number(self, raw)?,
            ConfigKey::MaxAttrCandidates => {
                selector.max_attr_candidates = parse_number(self, raw)?
            }
            ConfigKey::AllowRegenerate => {
                config.replay.allow_regenerate = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} expects true or false", self))?
            }
            ConfigKey::TimeoutMs => config.replay.timeout_ms = parse_number(self, raw)?,
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ConfigKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.path().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = ConfigKey::ALL.iter().map(|key| key.path()).collect();
                anyhow!("unknown key {}; expected one of: {}", s, known.join(", "))
            })
    }
}

fn parse_number<T>(key: ConfigKey, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} expects a non-negative integer, got {}", key, raw))
}

fn parse_list(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str(raw).context("excludeClass expects a JSON array of strings");
    }
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    // Reset must work over an unreadable file, so errors surface per action.
    let stored = AppConfig::read(path).await;
    match args.action {
        ConfigAction::Show => {
            let stored = stored?;
            match &stored {
                Some(_) => println!("# {}", path.display()),
                None => println!("# {} not found; defaults", path.display()),
            }
            print!("{}", serde_yaml::to_string(&stored.unwrap_or_default())?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = stored?.unwrap_or_default();
            key.set(&mut config, &value)?;
            config.write(path).await?;
            info!("Set {} = {}", key, key.get(&config));
            println!("Saved {} to {}", key, path.display());
        }
        ConfigAction::Get { key } => {
            println!("{}", key.get(&stored?.unwrap_or_default()));
        }
        ConfigAction::Keys => {
            let config = stored?.unwrap_or_default();
            for key in ConfigKey::ALL {
                println!("{:<28} {}", key.path(), key.get(&config));
            }
        }
        ConfigAction::Reset => {
            AppConfig::default().write(path).await?;
            println!("Wrote defaults to {}", path.display());
        }
        ConfigAction::Validate => match stored? {
            Some(config) => {
                config
                    .validate()
                    .with_context(|| format!("validating {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            }
            None => println!("No configuration file at {}; defaults are valid", path.display()),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_settings() {
        let mut config = AppConfig::default();
        for (key, raw) in [
            ("selector.maxDepth", "4"),
            ("replay.allowRegenerate", "false"),
            ("selector.excludeClass", "btn, card"),
            ("selector.buryingPoint", "data-track"),
        ] {
            let key: ConfigKey = key.parse().unwrap();
            key.set(&mut config, raw).unwrap();
        }
        assert_eq!(config.selector.max_depth, 4);
        assert!(!config.replay.allow_regenerate);
        assert_eq!(config.selector.exclude_class, vec!["btn", "card"]);
        assert_eq!(ConfigKey::ExcludeClass.get(&config), "btn,card");
        assert_eq!(ConfigKey::BuryingPoint.get(&config), "data-track");

        ConfigKey::ExcludeClass
            .set(&mut config, r#"["a b"]"#)
            .unwrap();
        assert_eq!(config.selector.exclude_class, vec!["a b"]);
        ConfigKey::BuryingPoint.set(&mut config, "none").unwrap();
        assert_eq!(config.selector.burying_point, None);
    }

    #[test]
    fn bad_keys_and_values_are_rejected() {
        assert!("selector.nope".parse::<ConfigKey>().is_err());
        assert_eq!(
            "Replay.TimeoutMs".parse::<ConfigKey>().unwrap(),
            ConfigKey::TimeoutMs
        );

        let mut config = AppConfig::default();
        assert!(ConfigKey::MaxDepth.set(&mut config, "-1").is_err());
        assert!(ConfigKey::AllowRegenerate.set(&mut config, "yes").is_err());
        assert!(ConfigKey::ExcludeClass.set(&mut config, "[1]").is_err());
        assert_eq!(config, AppConfig::default());
    }
}
