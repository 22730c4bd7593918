//! Remote build artifacts
//!
//! The bootstrap Bundler and the libyaml headers needed for native gem
//! builds are downloaded as gzip tarballs from a vendor bucket. Fetching
//! sits behind `ArtifactFetcher` so the transport can be swapped.

mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpFetcher;

use crate::error::RubypackResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A named, versioned archive in the vendor bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub version: String,
    /// File extension of the archive (`tar.gz`, `tgz`)
    pub extension: &'static str,
    /// Leading path components dropped while extracting
    pub strip_components: usize,
}

impl Artifact {
    /// Bundler gem tree; the tarball has a single top-level directory
    pub fn bundler(version: &str) -> Self {
        Self {
            name: "bundler".to_string(),
            version: version.to_string(),
            extension: "tar.gz",
            strip_components: 1,
        }
    }

    /// libyaml headers and shared library (`include/`, `lib/`)
    pub fn libyaml(version: &str) -> Self {
        Self {
            name: "libyaml".to_string(),
            version: version.to_string(),
            extension: "tgz",
            strip_components: 0,
        }
    }

    /// `name-version`
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `name-version.ext`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.dir_name(), self.extension)
    }
}

/// Fetches artifacts into local directories
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch `artifact` and extract it into `dest`, returning the extracted directory
    async fn fetch(&self, artifact: &Artifact, dest: &Path) -> RubypackResult<PathBuf>;
}
