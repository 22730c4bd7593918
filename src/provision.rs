//! Vendoring a prebuilt Ruby into the build directory

use crate::error::{RubypackError, RubypackResult};
use crate::fsutil;
use crate::layout::{BuildLayout, VENDOR_DIR};
use crate::version::RuntimeVersion;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Default directory holding prebuilt runtimes, one per version number
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/ruby";

/// Copies a prebuilt runtime into `vendor/` and links its executables
/// into `bin/`
#[derive(Debug, Clone)]
pub struct RuntimeProvisioner {
    install_root: PathBuf,
    layout: BuildLayout,
}

impl RuntimeProvisioner {
    pub fn new(install_root: impl Into<PathBuf>, layout: BuildLayout) -> Self {
        Self {
            install_root: install_root.into(),
            layout,
        }
    }

    /// Where the prebuilt runtime for `version` is expected
    pub fn source_dir(&self, version: &RuntimeVersion) -> PathBuf {
        self.install_root.join(version.number())
    }

    /// Vendor the runtime and return the shims created in `bin/`.
    ///
    /// Running it again for the same version yields the same tree.
    pub fn provision(&self, version: &RuntimeVersion) -> RubypackResult<Vec<PathBuf>> {
        let source = self.source_dir(version);
        let dest = self.layout.runtime_dir(version);
        // dest is removed below, so it must be a direct child of vendor/
        if !is_single_component(version.label()) || !is_single_component(version.number()) {
            return Err(RubypackError::Provisioning {
                version: version.label().to_string(),
                path: dest,
            });
        }
        if !source.is_dir() {
            return Err(RubypackError::Provisioning {
                version: version.label().to_string(),
                path: source,
            });
        }

        fsutil::remove_path(&dest)?;
        let files = fsutil::copy_tree(&source, &dest)?;
        info!("Vendored Ruby {} ({} files)", version, files);

        self.link_executables(version)
    }

    fn link_executables(&self, version: &RuntimeVersion) -> RubypackResult<Vec<PathBuf>> {
        let runtime_bin = self.layout.runtime_bin(version);
        let bin_dir = self.layout.bin_dir();
        fs::create_dir_all(&bin_dir)
            .map_err(|e| RubypackError::io(format!("creating {}", bin_dir.display()), e))?;

        let entries = match fs::read_dir(&runtime_bin) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RubypackError::io(
                    format!("listing {}", runtime_bin.display()),
                    e,
                ))
            }
        };

        // bin/<name> -> ../vendor/<label>/bin/<name>
        let relative_bin = Path::new("..")
            .join(VENDOR_DIR)
            .join(version.label())
            .join("bin");

        let mut names: Vec<_> = entries
            .filter_map(Result::ok)
            .filter(|entry| is_executable(&entry.path()))
            .map(|entry| entry.file_name())
            .collect();
        names.sort();

        let mut links = Vec::with_capacity(names.len());
        for name in names {
            let link = bin_dir.join(&name);
            fsutil::remove_path(&link)?;
            fsutil::symlink(&relative_bin.join(&name), &link)?;
            debug!("Linked {}", link.display());
            links.push(link);
        }
        Ok(links)
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
