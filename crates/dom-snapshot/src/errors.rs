//! Error types for snapshot construction

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    /// Markup could not be tokenized
    #[error("HTML parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    /// A `data-rect` layout hint was not four numbers
    #[error("Invalid layout box \"{value}\": expected x,y,width,height")]
    InvalidRect { value: String },

    /// Node id does not belong to this document
    #[error("Unknown node {0}")]
    UnknownNode(usize),
}

impl DomError {
    pub(crate) fn parse(offset: usize, reason: impl Into<String>) -> Self {
        DomError::Parse {
            offset,
            reason: reason.into(),
        }
    }
}
