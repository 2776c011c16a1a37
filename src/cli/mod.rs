pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod generate;
pub mod output;
pub mod page;
pub mod replay;
pub mod resolve;
pub mod runtime;

pub use app::run;
