//! Restore and store cached build paths

use super::metadata::{CacheMetadata, METADATA_FILE};
use crate::error::{RubypackError, RubypackResult};
use crate::fsutil;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mirrors relative build paths into the platform's cache directory
#[derive(Debug, Clone)]
pub struct CacheManager {
    build_dir: PathBuf,
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(build_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether the cache holds an entry for `relative`
    pub fn contains(&self, relative: &str) -> bool {
        self.cache_dir.join(relative).exists()
    }

    /// Copy the cached `relative` path into the build directory.
    ///
    /// Returns `false` (and changes nothing) when there is no cached entry.
    pub fn restore(&self, relative: &str) -> RubypackResult<bool> {
        let cached = self.cache_dir.join(relative);
        if !cached.exists() {
            debug!("Cache miss: {}", relative);
            return Ok(false);
        }

        let target = self.build_dir.join(relative);
        fsutil::remove_path(&target)?;
        let files = fsutil::copy_tree(&cached, &target)?;
        debug!("Restored {} from cache ({} files)", relative, files);
        Ok(true)
    }

    /// Replace the cached `relative` path with the build directory's copy.
    ///
    /// If the build has no such path the cached entry is dropped and
    /// `false` is returned.
    pub fn store(&self, relative: &str) -> RubypackResult<bool> {
        let source = self.build_dir.join(relative);
        let cached = self.cache_dir.join(relative);

        fsutil::remove_path(&cached)?;
        if !source.exists() {
            debug!("Nothing to cache at {}", relative);
            return Ok(false);
        }

        let files = fsutil::copy_tree(&source, &cached)?;
        debug!("Stored {} in cache ({} files)", relative, files);
        Ok(true)
    }

    /// Read the metadata record; an unreadable record counts as absent
    pub fn read_metadata(&self) -> Option<CacheMetadata> {
        let path = self.cache_dir.join(METADATA_FILE);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Ignoring unreadable cache metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the metadata record
    pub fn write_metadata(&self, metadata: &CacheMetadata) -> RubypackResult<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            RubypackError::io(format!("creating cache dir {}", self.cache_dir.display()), e)
        })?;

        let path = self.cache_dir.join(METADATA_FILE);
        let content = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, content)
            .map_err(|e| RubypackError::io(format!("writing {}", path.display()), e))
    }
}
