//! CLI command implementations

pub mod compile;
pub mod config;

pub use compile::execute as compile;
pub use config::execute as config;
