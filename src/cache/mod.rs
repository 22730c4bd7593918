//! Build-to-build cache
//!
//! The platform hands every build a cache directory that survives to the
//! next build of the same app. Selected build paths are mirrored into it
//! after a successful install and copied back before the next one, so
//! Bundler only fetches and compiles what changed.
//!
//! # Cached paths
//!
//! | Path | Contents |
//! |------|----------|
//! | `.bundle` | Bundler configuration |
//! | `vendor/bundle` | Installed gems, including compiled extensions |
//!
//! A metadata record stored next to them remembers which Ruby built the
//! gems; a cache built for another Ruby is not restored.

pub mod manager;
pub mod metadata;

pub use manager::CacheManager;
pub use metadata::CacheMetadata;
