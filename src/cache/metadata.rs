//! Metadata describing what a stored cache was built with

use crate::lockfile::LockedDependencySet;
use crate::version::{RuntimeVersion, VersionSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the metadata record inside the cache directory
pub const METADATA_FILE: &str = "rubypack-cache.json";

/// What the cached gems were built with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Ruby label the gems were compiled against
    pub ruby_version: String,
    /// Where that version came from
    pub version_source: VersionSource,
    /// Digest of the lockfile that was installed
    pub lockfile_digest: String,
    /// When the cache was stored
    pub stored_at: DateTime<Utc>,
}

impl CacheMetadata {
    /// Describe a cache stored now for `version` and `lockfile`
    pub fn new(version: &RuntimeVersion, lockfile: &LockedDependencySet) -> Self {
        Self {
            ruby_version: version.label().to_string(),
            version_source: version.source(),
            lockfile_digest: lockfile.digest.clone(),
            stored_at: Utc::now(),
        }
    }

    /// Whether gems from this cache can be loaded by `version`
    pub fn is_compatible_with(&self, version: &RuntimeVersion) -> bool {
        self.ruby_version == version.label()
    }

    /// Whether the cache was stored for the same lockfile contents
    pub fn matches_lockfile(&self, lockfile: &LockedDependencySet) -> bool {
        self.lockfile_digest == lockfile.digest
    }
}
