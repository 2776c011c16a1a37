//! Generation settings

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::GenerateError;
use crate::table::BLOCK_SIZE;

/// Selector generation configuration.
///
/// Patterns are regular expressions; an empty pattern disables that filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    /// Attribute treated as the highest-priority selector source
    /// (e.g. `data-track-id`). Unset by default.
    pub burying_point: Option<String>,

    /// Classes never used in class fragments.
    pub exclude_class: Vec<String>,

    /// Ephemeral state classes (hover, active, focus) to strip.
    /// Default: `(^|-)(hover|active|focus)$`
    pub exclude_class_modify: String,

    /// Attribute values that look generated.
    /// Default: five or more consecutive digits
    pub exclude_attr: String,

    /// Id values that look generated.
    /// Default: leading digit, long digit runs, framework prefixes
    pub exclude_id_by_val: String,

    /// Deepest ancestor level searched.
    /// Default: 6
    pub max_depth: usize,

    /// Maximum number of combined selectors produced.
    /// Default: 3
    pub max_results: usize,

    /// Maximum attribute fragments per element.
    /// Default: 10
    pub max_attr_candidates: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            burying_point: None,
            exclude_class: Vec::new(),
            exclude_class_modify: "(^|-)(hover|active|focus)$".to_string(),
            exclude_attr: r"\d{5,}".to_string(),
            exclude_id_by_val: r"^\d|\d{5,}|^(ember|radix-|headlessui-|rc-|el-id-)".to_string(),
            max_depth: 6,
            max_results: 3,
            max_attr_candidates: 10,
        }
    }
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Option<Regex>, GenerateError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|err| GenerateError::InvalidPattern {
            field,
            reason: err.to_string(),
        })
}

impl SelectorConfig {
    /// Check limits and patterns without keeping the compiled form.
    pub fn validate(&self) -> Result<(), GenerateError> {
        self.compile().map(|_| ())
    }

    pub fn compile(&self) -> Result<SelectorRules, GenerateError> {
        if self.max_results == 0 {
            return Err(GenerateError::InvalidConfig(
                "maxResults must be at least 1".to_string(),
            ));
        }
        if self.max_attr_candidates as u32 > BLOCK_SIZE {
            return Err(GenerateError::InvalidConfig(format!(
                "maxAttrCandidates must not exceed {BLOCK_SIZE}"
            )));
        }
        let burying_point = self
            .burying_point
            .as_deref()
            .map(str::trim)
            .filter(|attr| !attr.is_empty())
            .map(str::to_ascii_lowercase);

        Ok(SelectorRules {
            burying_point,
            exclude_class: self.exclude_class.clone(),
            exclude_class_modify: compile_pattern("excludeClassModify", &self.exclude_class_modify)?,
            exclude_attr: compile_pattern("excludeAttr", &self.exclude_attr)?,
            exclude_id_by_val: compile_pattern("excludeIdByVal", &self.exclude_id_by_val)?,
            max_depth: self.max_depth,
            max_results: self.max_results,
            max_attr_candidates: self.max_attr_candidates,
        })
    }
}

/// Compiled form of [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct SelectorRules {
    pub burying_point: Option<String>,
    pub exclude_class: Vec<String>,
    pub exclude_class_modify: Option<Regex>,
    pub exclude_attr: Option<Regex>,
    pub exclude_id_by_val: Option<Regex>,
    pub max_depth: usize,
    pub max_results: usize,
    pub max_attr_candidates: usize,
}

impl SelectorRules {
    pub fn is_excluded_class(&self, class: &str) -> bool {
        self.exclude_class.iter().any(|excluded| excluded == class)
            || self
                .exclude_class_modify
                .as_ref()
                .is_some_and(|re| re.is_match(class))
    }

    pub fn is_excluded_attr_value(&self, value: &str) -> bool {
        self.exclude_attr.as_ref().is_some_and(|re| re.is_match(value))
    }

    pub fn is_excluded_id(&self, id: &str) -> bool {
        self.exclude_id_by_val
            .as_ref()
            .is_some_and(|re| re.is_match(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let rules = SelectorConfig::default().compile().unwrap();
        assert!(rules.is_excluded_class("btn-hover"));
        assert!(rules.is_excluded_class("active"));
        assert!(rules.is_excluded_class("is-focus"));
        assert!(!rules.is_excluded_class("primary"));
        assert!(!rules.is_excluded_class("inactive"));
        assert!(!rules.is_excluded_class("interactive"));
        assert!(!rules.is_excluded_class("hover-card"));
        assert!(rules.is_excluded_id("1234"));
        assert!(rules.is_excluded_id("ember42"));
        assert!(rules.is_excluded_id("row-1699999999"));
        assert!(!rules.is_excluded_id("login"));
        assert!(rules.is_excluded_attr_value("item-123456"));
        assert!(!rules.is_excluded_attr_value("submit"));
    }

    #[test]
    fn test_empty_pattern_disables_filter() {
        let config = SelectorConfig {
            exclude_id_by_val: String::new(),
            ..SelectorConfig::default()
        };
        assert!(!config.compile().unwrap().is_excluded_id("1234"));
    }

    #[test]
    fn test_invalid_values() {
        let bad_pattern = SelectorConfig {
            exclude_attr: "(".to_string(),
            ..SelectorConfig::default()
        };
        assert!(matches!(
            bad_pattern.validate(),
            Err(GenerateError::InvalidPattern { field: "excludeAttr", .. })
        ));

        let no_results = SelectorConfig {
            max_results: 0,
            ..SelectorConfig::default()
        };
        assert!(no_results.validate().unwrap_err().is_config_error());

        let too_many_attrs = SelectorConfig {
            max_attr_candidates: 11,
            ..SelectorConfig::default()
        };
        assert!(too_many_attrs.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_camel_case() {
        let config: SelectorConfig =
            serde_json::from_str(r#"{"buryingPoint":"data-track","maxDepth":4}"#).unwrap();
        assert_eq!(config.burying_point.as_deref(), Some("data-track"));
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_results, 3);
    }
}
