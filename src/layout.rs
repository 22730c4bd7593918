//! Paths inside the build directory

use crate::version::RuntimeVersion;
use std::path::{Path, PathBuf};

/// Top-level directory for executable shims
pub const BIN_DIR: &str = "bin";
/// Vendored runtimes and gems live under here
pub const VENDOR_DIR: &str = "vendor";
/// Bundler install path, relative to the build directory
pub const BUNDLE_PATH: &str = "vendor/bundle";
/// Bundler's per-app configuration directory
pub const BUNDLE_CONFIG_DIR: &str = ".bundle";
/// Startup script sourced by the running app
pub const PROFILE_SCRIPT: &str = ".profile.d/ruby.sh";
pub const GEMFILE: &str = "Gemfile";
pub const LOCKFILE: &str = "Gemfile.lock";

/// Engine name used for the gem directory when the version names none
const DEFAULT_ENGINE: &str = "ruby";

/// Layout of a build directory
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The build directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the build directory
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path(BIN_DIR)
    }

    pub fn gemfile(&self) -> PathBuf {
        self.path(GEMFILE)
    }

    pub fn lockfile(&self) -> PathBuf {
        self.path(LOCKFILE)
    }

    pub fn bundle_dir(&self) -> PathBuf {
        self.path(BUNDLE_PATH)
    }

    pub fn bundle_config(&self) -> PathBuf {
        self.path(BUNDLE_CONFIG_DIR).join("config")
    }

    pub fn profile_script(&self) -> PathBuf {
        self.path(PROFILE_SCRIPT)
    }

    /// `vendor/<label>`, where the runtime is copied
    pub fn runtime_rel(&self, version: &RuntimeVersion) -> String {
        format!("{}/{}", VENDOR_DIR, version.label())
    }

    pub fn runtime_dir(&self, version: &RuntimeVersion) -> PathBuf {
        self.path(&self.runtime_rel(version))
    }

    /// Executables of the vendored runtime (`ruby`, `gem`, `bundle`)
    pub fn runtime_bin(&self, version: &RuntimeVersion) -> PathBuf {
        self.runtime_dir(version).join("bin")
    }

    /// `vendor/bundle/<engine>/<abi>`, where Bundler puts gems
    pub fn gem_dir_rel(&self, version: &RuntimeVersion) -> String {
        format!(
            "{}/{}/{}",
            BUNDLE_PATH,
            version.engine().unwrap_or(DEFAULT_ENGINE),
            version.abi_version()
        )
    }

    pub fn gem_dir(&self, version: &RuntimeVersion) -> PathBuf {
        self.path(&self.gem_dir_rel(version))
    }
}
