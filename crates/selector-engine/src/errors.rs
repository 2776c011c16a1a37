//! Error types for selector parsing and evaluation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ambiguous match reported by a strict-mode violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPreview {
    /// Short HTML-like rendering of the element
    pub preview: String,

    /// Selector that resolves to this element alone
    pub selector: String,
}

/// Query error enumeration
///
/// Every variant embeds the selector that produced it. None of them are
/// retried by the engine itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    /// Engine name not present in the registry
    #[error("Unknown engine \"{engine}\" while parsing selector {selector}")]
    UnknownEngine { engine: String, selector: String },

    /// Syntax error in the selector or one of its engine bodies
    #[error("Malformed selector: {reason} (in {selector})")]
    Malformed { selector: String, reason: String },

    /// Element-only engine evaluated against a non-element root
    #[error("Engine \"{engine}\" requires an element root (in {selector})")]
    NotAnElement { engine: String, selector: String },

    /// Root node cannot be queried (text node or foreign id)
    #[error("Node is not queryable (in {selector})")]
    NotQueryable { selector: String },

    /// Text or name regex failed to compile
    #[error("Invalid regular expression /{pattern}/: {reason} (in {selector})")]
    InvalidRegex {
        pattern: String,
        reason: String,
        selector: String,
    },

    /// `control=` body other than the known commands
    #[error("Internal error, unknown control selector {body} (in {selector})")]
    UnknownControl { body: String, selector: String },

    /// Strict-mode resolution matched more than one element
    #[error("{message}")]
    StrictModeViolation {
        selector: String,
        count: usize,
        matches: Vec<MatchPreview>,
        message: String,
    },
}

impl QueryError {
    /// Selector string embedded in the error.
    pub fn selector(&self) -> &str {
        match self {
            QueryError::UnknownEngine { selector, .. }
            | QueryError::Malformed { selector, .. }
            | QueryError::NotAnElement { selector, .. }
            | QueryError::NotQueryable { selector }
            | QueryError::InvalidRegex { selector, .. }
            | QueryError::UnknownControl { selector, .. }
            | QueryError::StrictModeViolation { selector, .. } => selector,
        }
    }

    /// Parse-time failures (as opposed to evaluation failures).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            QueryError::UnknownEngine { .. }
                | QueryError::Malformed { .. }
                | QueryError::InvalidRegex { .. }
        )
    }

    pub fn is_ambiguity(&self) -> bool {
        matches!(self, QueryError::StrictModeViolation { .. })
    }
}

/// Failure raised inside one engine before the selector is known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineFailure {
    Malformed(String),
    NotAnElement(&'static str),
    InvalidRegex { pattern: String, reason: String },
    UnknownControl(String),
}

impl EngineFailure {
    pub(crate) fn with_selector(self, selector: &str) -> QueryError {
        let selector = selector.to_string();
        match self {
            EngineFailure::Malformed(reason) => QueryError::Malformed { selector, reason },
            EngineFailure::NotAnElement(engine) => QueryError::NotAnElement {
                engine: engine.to_string(),
                selector,
            },
            EngineFailure::InvalidRegex { pattern, reason } => QueryError::InvalidRegex {
                pattern,
                reason,
                selector,
            },
            EngineFailure::UnknownControl(body) => QueryError::UnknownControl { body, selector },
        }
    }
}
