//! DOM snapshot - the page model the selector subsystem reads from
//!
//! This crate provides:
//! - An arena tree of document, element and text nodes
//! - A forgiving HTML parser for fixtures and captured markup
//! - Visibility rules derived from attributes, inline style and layout boxes
//! - Implicit ARIA roles and accessible names

pub mod aria;
pub mod document;
pub mod errors;
pub mod escape;
pub mod node;
pub mod parser;
pub mod style;

pub use aria::*;
pub use document::*;
pub use errors::*;
pub use escape::*;
pub use node::*;
pub use parser::parse_html;
pub use style::*;
