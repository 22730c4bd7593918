//! rubypack - Ruby buildpack compiler
//!
//! Vendors a prebuilt Ruby into an app's build directory, installs the
//! app's locked gems with Bundler, and keeps installed gems in a cache
//! directory between builds.

pub mod cache;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod hook;
pub mod install;
pub mod layout;
pub mod lockfile;
pub mod pipeline;
pub mod process;
pub mod provision;
pub mod ui;
pub mod version;

pub use error::{RubypackError, RubypackResult};
