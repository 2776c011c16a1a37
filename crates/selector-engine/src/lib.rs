//! Selector engine - combinator selector language over DOM snapshots
//!
//! This crate implements:
//! - Parsing of `>>`-joined engine selectors with capture and nested bodies
//! - A registry of engines: css, xpath, text, attribute, role, visible,
//!   control, has, nth and the layout family
//! - Order-preserving evaluation and strict-mode resolution with previews

mod css;
mod role;
mod text;
mod xpath;

pub mod errors;
pub mod evaluator;
pub mod layout;
pub mod parser;
pub mod preview;

pub use css::SelectorList;
pub use errors::*;
pub use evaluator::*;
pub use layout::LayoutKind;
pub use parser::*;
pub use preview::{preview_node, unique_selector};
pub use role::{NameMatcher, RoleQuery};
pub use text::{TextMatchKind, TextQuery};
pub use xpath::XPathExpr;
