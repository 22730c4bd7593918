//! In-memory artifact fetcher for tests

use super::{Artifact, ArtifactFetcher};
use crate::error::{RubypackError, RubypackResult};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fetcher that lays out an empty `bin/`, `include/` and `lib/` tree
/// instead of downloading, and records what was asked for
#[derive(Default)]
pub(crate) struct FakeFetcher {
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// File names of every artifact fetched so far
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, artifact: &Artifact, dest: &Path) -> RubypackResult<PathBuf> {
        self.fetched.lock().unwrap().push(artifact.file_name());
        for dir in ["bin", "include", "lib"] {
            fs::create_dir_all(dest.join(dir))
                .map_err(|e| RubypackError::io("laying out fake artifact", e))?;
        }
        Ok(dest.to_path_buf())
    }
}
