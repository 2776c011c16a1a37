//! Selector generation - robust selectors for recorded elements
//!
//! This crate provides:
//! - Ranked candidate fragments per element (burying point, id, text,
//!   weighted attributes, classes, tag)
//! - An ancestor level map of those fragments
//! - A recursive search combining fragments into up to three selectors that
//!   each resolve the recorded element from the document root
//! - The persisted `SelectorInfo` record and replay-time regeneration

pub mod candidates;
pub mod config;
pub mod errors;
pub mod generator;
pub mod info;
pub mod level_map;
pub mod resolver;
pub mod table;

pub use candidates::*;
pub use config::*;
pub use errors::*;
pub use generator::*;
pub use info::*;
pub use level_map::*;
pub use resolver::*;
pub use table::*;
