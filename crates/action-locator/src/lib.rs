//! Replay-time locator - ordered selector fallback
//!
//! This crate provides:
//! - `FallbackRunner::try_in_order` over recorded selectors
//! - Replay-time regeneration from a persisted level map
//! - The `ActionDriver` seam and a snapshot-backed driver
//! - Cooperative cancellation and deadlines between attempts

pub mod context;
pub mod driver;
pub mod errors;
pub mod fallback;
pub mod regen;
pub mod types;

pub use context::*;
pub use driver::*;
pub use errors::*;
pub use fallback::*;
pub use regen::*;
pub use types::*;
