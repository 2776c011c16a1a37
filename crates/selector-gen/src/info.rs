//! Persisted selector record

use serde::{Deserialize, Serialize};

use crate::errors::GenerateError;
use crate::level_map::LevelSelectorMap;

/// Selector information stored with a recorded action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorInfo {
    /// Candidate tables per ancestor level, kept for replay-time regeneration.
    pub level_selector_map: LevelSelectorMap,

    /// Ranked combined selectors, each resolving the recorded element.
    pub first_selector: Vec<String>,
}

impl SelectorInfo {
    pub fn new(level_selector_map: LevelSelectorMap, first_selector: Vec<String>) -> Self {
        Self {
            level_selector_map,
            first_selector,
        }
    }

    /// Preferred selector, if any.
    pub fn actual_selector(&self) -> Option<&str> {
        self.first_selector.first().map(String::as_str)
    }

    /// True when no combined selector was found.
    pub fn is_empty(&self) -> bool {
        self.first_selector.is_empty()
    }

    pub fn to_json(&self) -> Result<String, GenerateError> {
        serde_json::to_string_pretty(self).map_err(|err| GenerateError::InvalidInfo(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, GenerateError> {
        serde_json::from_str(json).map_err(|err| GenerateError::InvalidInfo(err.to_string()))
    }
}
