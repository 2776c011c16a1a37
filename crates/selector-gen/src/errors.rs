//! Error types for selector generation

use dom_snapshot::NodeId;
use thiserror::Error;

/// Generation error enumeration
///
/// Query failures during candidate trials never surface here; they count as
/// zero matches.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerateError {
    /// An exclusion pattern failed to compile
    #[error("Invalid pattern for {field}: {reason}")]
    InvalidPattern { field: &'static str, reason: String },

    /// Limits out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Target is a text node, the document, or unknown
    #[error("Target {0} is not an element")]
    NotAnElement(NodeId),

    /// Persisted selector info could not be decoded
    #[error("Invalid selector info: {0}")]
    InvalidInfo(String),
}

impl GenerateError {
    /// Configuration problems are fixed by the operator, not by retrying.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GenerateError::InvalidPattern { .. } | GenerateError::InvalidConfig(_)
        )
    }
}
