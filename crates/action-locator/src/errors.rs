//! Error types for replay-time location and actions

use selector_engine::QueryError;
use selector_gen::GenerateError;
use thiserror::Error;

/// Failure of a single action attempt against one selector
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Selector resolved to nothing
    #[error("No element matches selector: {0}")]
    NotFound(String),

    /// Selector resolved to several elements
    #[error("{0}")]
    Ambiguous(QueryError),

    /// Selector could not be parsed or evaluated
    #[error("Invalid selector: {0}")]
    InvalidSelector(QueryError),

    /// Element exists but cannot receive the action (hidden, disabled,
    /// wrong kind of element)
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Element left the page between resolution and action
    #[error("Element detached: {0}")]
    Detached(String),

    /// Element resolved but a visibility check on it failed
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Failure reported by an external driver
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ActionError {
    /// Whether another attempt (or another selector) might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::NotFound(_)
                | ActionError::NotInteractable(_)
                | ActionError::Detached(_)
                | ActionError::AssertionFailed(_)
                | ActionError::Driver(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::InvalidSelector(_) => 2,
            ActionError::Ambiguous(_) | ActionError::Driver(_) => 1,
            _ => 0,
        }
    }
}

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No recorded selectors and none could be regenerated
    #[error(
        "No selector available for this action; re-record the step or add a stable \
         burying-point attribute (e.g. data-testid) to the element"
    )]
    SelectorMissing,

    /// Cancellation token fired between attempts
    #[error("Replay cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: usize },

    /// Deadline passed between attempts
    #[error("Replay deadline exceeded after {attempts} attempt(s)")]
    Timeout { attempts: usize },

    /// The last candidate failed; earlier failures were logged
    #[error("Action failed for selector '{selector}': {source}")]
    Action {
        selector: String,
        #[source]
        source: ActionError,
    },

    /// A selector resolved but the value it read did not match
    #[error("Assertion failed for selector '{selector}': {message}")]
    Assertion { selector: String, message: String },

    /// Live page snapshot could not be taken
    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    /// Selector regeneration failed
    #[error("Regeneration failed: {0}")]
    Generate(#[from] GenerateError),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::Timeout { .. } | LocatorError::Snapshot(_) => true,
            LocatorError::Action { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::SelectorMissing | LocatorError::Generate(_) => 3,
            LocatorError::Snapshot(_)
            | LocatorError::Timeout { .. }
            | LocatorError::Assertion { .. } => 2,
            LocatorError::Action { source, .. } => source.severity().max(1),
            LocatorError::Cancelled { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_follows_last_failure() {
        let err = LocatorError::Action {
            selector: "id=go".to_string(),
            source: ActionError::NotInteractable("element is disabled".to_string()),
        };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), 1);
        assert_eq!(
            err.to_string(),
            "Action failed for selector 'id=go': Element not interactable: element is disabled"
        );

        assert!(!LocatorError::SelectorMissing.is_retryable());
        assert_eq!(LocatorError::SelectorMissing.severity(), 3);
        assert!(LocatorError::SelectorMissing.to_string().contains("burying-point"));
    }
}
