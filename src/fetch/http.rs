//! HTTP artifact fetcher (ureq download, flate2 + tar extraction)

use super::{Artifact, ArtifactFetcher};
use crate::error::{RubypackError, RubypackResult};
use crate::ui::{TaskSpinner, UiContext};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Downloads `<base_url>/<name>-<version>.<ext>` and extracts it
pub struct HttpFetcher {
    base_url: String,
    ui: UiContext,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, ui: UiContext) -> Self {
        Self {
            base_url: base_url.into(),
            ui,
        }
    }

    /// Download URL for an artifact
    pub fn url_for(&self, artifact: &Artifact) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            artifact.file_name()
        )
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, artifact: &Artifact, dest: &Path) -> RubypackResult<PathBuf> {
        let url = self.url_for(artifact);
        debug!("Fetching {} into {}", url, dest.display());

        let mut spinner = TaskSpinner::new(&self.ui);
        spinner.start(&format!("Fetching {}", artifact.file_name()));

        let target = dest.to_path_buf();
        let strip = artifact.strip_components;
        let outcome = tokio::task::spawn_blocking(move || download_and_unpack(&url, &target, strip))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result);

        match outcome {
            Ok(()) => {
                spinner.stop(&format!("Fetched {}", artifact.file_name()));
                Ok(dest.to_path_buf())
            }
            Err(reason) => {
                spinner.stop_error(&format!("Could not fetch {}", artifact.file_name()));
                Err(RubypackError::Fetch {
                    artifact: artifact.file_name(),
                    reason,
                })
            }
        }
    }
}

fn download_and_unpack(url: &str, dest: &Path, strip_components: usize) -> Result<(), String> {
    fs::create_dir_all(dest).map_err(|e| format!("creating {}: {}", dest.display(), e))?;

    let response = ureq::get(url).call().map_err(|e| e.to_string())?;
    unpack(response.into_body().into_reader(), dest, strip_components)
        .map_err(|e| format!("extracting {}: {}", url, e))
}

/// Extract a gzip tarball into `dest`, dropping `strip_components` leading
/// path components. Entries that would land outside `dest` are skipped.
pub(crate) fn unpack<R: Read>(
    reader: R,
    dest: &Path,
    strip_components: usize,
) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        let stripped: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .skip(strip_components)
            .collect();

        if stripped.as_os_str().is_empty()
            || stripped
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            continue;
        }

        let target = dest.join(&stripped);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use tempfile::TempDir;

    fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn url_for_joins_base() {
        let fetcher = HttpFetcher::new("https://example.com/vendor/", UiContext::non_interactive());
        assert_eq!(
            fetcher.url_for(&Artifact::bundler("2.0.2")),
            "https://example.com/vendor/bundler-2.0.2.tar.gz"
        );
    }

    #[test]
    fn unpack_strips_leading_component() {
        let dir = TempDir::new().unwrap();
        let data = tarball(&[
            ("bundler-2.0.2/bin/bundle", b"#!/usr/bin/env ruby\n"),
            ("bundler-2.0.2/lib/bundler.rb", b"module Bundler; end\n"),
        ]);

        unpack(data.as_slice(), dir.path(), 1).unwrap();

        assert!(dir.path().join("bin/bundle").is_file());
        assert!(dir.path().join("lib/bundler.rb").is_file());
        assert!(!dir.path().join("bundler-2.0.2").exists());
    }

    #[test]
    fn unpack_without_strip_keeps_layout() {
        let dir = TempDir::new().unwrap();
        let data = tarball(&[("include/yaml.h", b"/* yaml */\n"), ("lib/libyaml.so", b"ELF")]);

        unpack(data.as_slice(), dir.path(), 0).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("include/yaml.h")).unwrap(),
            "/* yaml */\n"
        );
        assert!(dir.path().join("lib/libyaml.so").is_file());
    }
}
