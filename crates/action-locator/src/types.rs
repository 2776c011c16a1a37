//! Core types for replayed actions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ActionError;

/// Mouse button for click actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Keyboard modifier held during an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Alt,
    Control,
    Meta,
    Shift,
}

impl Modifier {
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Alt => "Alt",
            Modifier::Control => "Control",
            Modifier::Meta => "Meta",
            Modifier::Shift => "Shift",
        }
    }
}

/// Action replayed against a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectorAction {
    Click {
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "default_click_count")]
        click_count: u32,
        #[serde(default)]
        modifiers: Vec<Modifier>,
    },
    DoubleClick,
    Hover,
    Fill {
        content: String,
    },
    Press {
        key: String,
        #[serde(default)]
        modifiers: Vec<Modifier>,
    },
    /// Passes when the element is visible; a hidden match falls through to
    /// the next selector.
    AssertVisible,
    /// Reads the element's input value and compares it once a selector resolves.
    AssertValue {
        value: String,
    },
    /// Reads the checkbox/radio state and compares it once a selector resolves.
    AssertChecked {
        checked: bool,
    },
}

fn default_click_count() -> u32 {
    1
}

impl SelectorAction {
    /// Plain left click
    pub fn click() -> Self {
        SelectorAction::Click {
            button: MouseButton::Left,
            click_count: default_click_count(),
            modifiers: Vec::new(),
        }
    }

    pub fn fill(content: impl Into<String>) -> Self {
        SelectorAction::Fill {
            content: content.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectorAction::Click { .. } => "click",
            SelectorAction::DoubleClick => "double_click",
            SelectorAction::Hover => "hover",
            SelectorAction::Fill { .. } => "fill",
            SelectorAction::Press { .. } => "press",
            SelectorAction::AssertVisible => "assert_visible",
            SelectorAction::AssertValue { .. } => "assert_value",
            SelectorAction::AssertChecked { .. } => "assert_checked",
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            SelectorAction::AssertVisible
                | SelectorAction::AssertValue { .. }
                | SelectorAction::AssertChecked { .. }
        )
    }

    /// Actions that a disabled element refuses
    pub fn requires_enabled(&self) -> bool {
        !matches!(self, SelectorAction::Hover) && !self.is_assertion()
    }

    /// Whether an empty selector list may be regenerated for this action.
    /// Visibility checks run on recorded selectors only.
    pub fn allows_regenerate(&self) -> bool {
        !matches!(self, SelectorAction::AssertVisible)
    }

    /// Compare what the winning selector read against the expectation.
    pub fn verify(&self, output: &ActionOutput) -> Result<(), String> {
        match (self, output) {
            (SelectorAction::AssertValue { value }, ActionOutput::Value(actual)) if actual != value => {
                Err(format!("expected value \"{value}\", found \"{actual}\""))
            }
            (SelectorAction::AssertChecked { checked }, ActionOutput::Checked(actual))
                if actual != checked =>
            {
                Err(format!("expected checked={checked}, found checked={actual}"))
            }
            (SelectorAction::AssertValue { .. }, ActionOutput::Value(_))
            | (SelectorAction::AssertChecked { .. }, ActionOutput::Checked(_)) => Ok(()),
            (SelectorAction::AssertValue { .. } | SelectorAction::AssertChecked { .. }, other) => {
                Err(format!("driver returned {other:?} for {}", self.name()))
            }
            _ => Ok(()),
        }
    }

    /// Key chord for `Press`, e.g. `Shift+Control+Enter`.
    pub fn key_chord(&self) -> Option<String> {
        match self {
            SelectorAction::Press { key, modifiers } => Some(
                modifiers
                    .iter()
                    .map(|m| -> &str { m.name() })
                    .chain(std::iter::once(key.as_str()))
                    .collect::<Vec<_>>()
                    .join("+"),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for SelectorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorAction::Click { click_count, .. } if *click_count > 1 => {
                write!(f, "click x{click_count}")
            }
            SelectorAction::Fill { content } => write!(f, "fill \"{content}\""),
            SelectorAction::Press { .. } => {
                write!(f, "press {}", self.key_chord().unwrap_or_default())
            }
            SelectorAction::AssertValue { value } => write!(f, "assert_value \"{value}\""),
            SelectorAction::AssertChecked { checked } => write!(f, "assert_checked {checked}"),
            other => f.write_str(other.name()),
        }
    }
}

/// What a driver hands back for one performed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ActionOutput {
    Done,
    Value(String),
    Checked(bool),
}

/// A candidate selector that failed before the winning one
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub index: usize,
    pub selector: String,
    pub error: ActionError,
}

/// Result of a successful fallback run
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    /// Selector that performed the action
    pub selector: String,

    /// Position of the winning selector in the tried list
    pub index: usize,

    /// Earlier candidates that failed, in order
    pub failed: Vec<FailedAttempt>,

    /// Whether the candidates came from replay-time regeneration
    pub regenerated: bool,

    /// Driver result for the winning selector
    pub output: ActionOutput,
}

impl FallbackOutcome {
    pub fn attempts(&self) -> usize {
        self.failed.len() + 1
    }
}
