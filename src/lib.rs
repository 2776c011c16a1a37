//! SoulSelector library
//!
//! Exposes the CLI and its settings for integration testing

pub mod app_settings;
pub mod cli;

pub use app_settings::{AppConfig, ReplayConfig};
