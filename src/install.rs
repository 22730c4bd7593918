//! Installing the app's gems with Bundler
//!
//! Bundler is driven as an external tool: rubypack only enforces that a
//! lockfile exists, prepares the native-build environment, and carries
//! the installed gems between builds through the cache.

use crate::cache::{CacheManager, CacheMetadata};
use crate::env::EnvironmentVariableSet;
use crate::error::{RubypackError, RubypackResult};
use crate::fetch::{Artifact, ArtifactFetcher};
use crate::fsutil;
use crate::layout::{BuildLayout, BIN_DIR, BUNDLE_CONFIG_DIR, BUNDLE_PATH};
use crate::lockfile::LockedDependencySet;
use crate::process::{CommandSpec, ProcessExecutor};
use crate::ui::{self, UiContext};
use crate::version::RuntimeVersion;
use tracing::{debug, info, warn};

/// Groups skipped when `BUNDLE_WITHOUT` is not set
pub const DEFAULT_WITHOUT: &str = "development:test";

/// Settings for one install
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub bundler_version: String,
    pub libyaml_version: String,
    /// Colon-separated groups to skip; [`DEFAULT_WITHOUT`] when `None`
    pub without: Option<String>,
}

impl InstallOptions {
    pub fn without(&self) -> &str {
        self.without
            .as_deref()
            .filter(|groups| !groups.trim().is_empty())
            .unwrap_or(DEFAULT_WITHOUT)
    }
}

/// What a successful install did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// `bundle version` as reported by the vendored Bundler
    pub bundler_version: String,
    /// Whether installed gems were restored from a previous build
    pub reused_cache: bool,
}

/// Runs `bundle install` against the vendored runtime
pub struct DependencyInstaller<'a> {
    layout: &'a BuildLayout,
    cache: &'a CacheManager,
    executor: &'a dyn ProcessExecutor,
    fetcher: &'a dyn ArtifactFetcher,
    ui: UiContext,
    options: InstallOptions,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(
        layout: &'a BuildLayout,
        cache: &'a CacheManager,
        executor: &'a dyn ProcessExecutor,
        fetcher: &'a dyn ArtifactFetcher,
        ui: UiContext,
        options: InstallOptions,
    ) -> Self {
        Self {
            layout,
            cache,
            executor,
            fetcher,
            ui,
            options,
        }
    }

    /// Install the locked gems for `version`.
    ///
    /// Fails before running anything when there is no lockfile. A failing
    /// `bundle install` fails with the tail of its output; it is not retried.
    pub async fn install(
        &self,
        version: &RuntimeVersion,
        lockfile: Option<&LockedDependencySet>,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<InstallReport> {
        let Some(lockfile) = lockfile else {
            return Err(RubypackError::MissingLockfile {
                path: self.layout.lockfile(),
            });
        };

        let runtime_bin = self.layout.runtime_bin(version);
        let without = self.options.without().to_string();

        self.install_bundler(version, env).await?;

        self.cache.restore(BUNDLE_CONFIG_DIR)?;

        let bundler_version = self
            .executor
            .run_stdout(
                &CommandSpec::new(runtime_bin.join("bundle"))
                    .arg("version")
                    .with_env(env)
                    .current_dir(self.layout.root()),
            )
            .await?;
        ui::topic(
            &self.ui,
            &format!("Installing dependencies using {}", bundler_version),
        );

        let reused_cache = self.restore_gems(version, lockfile)?;

        let scratch = tempfile::Builder::new()
            .prefix("libyaml-")
            .tempdir()
            .map_err(|e| RubypackError::io("creating libyaml scratch directory", e))?;
        let libyaml = Artifact::libyaml(&self.options.libyaml_version);
        let libyaml_dir = self
            .fetcher
            .fetch(&libyaml, &scratch.path().join(libyaml.dir_name()))
            .await?;

        let mut install_env = env.clone();
        let include = libyaml_dir.join("include").display().to_string();
        install_env.prepend("CPATH", include.clone());
        install_env.prepend("CPPATH", include);
        install_env.prepend("LIBRARY_PATH", libyaml_dir.join("lib").display().to_string());
        install_env.set_override("BUNDLE_GEMFILE", self.layout.gemfile().display().to_string());
        install_env.set_override(
            "BUNDLE_CONFIG",
            self.layout.bundle_config().display().to_string(),
        );

        let binstubs = format!("{}/", BIN_DIR);
        let install = CommandSpec::new(runtime_bin.join("bundle"))
            .args(["install", "--without", without.as_str()])
            .args(["--path", BUNDLE_PATH])
            .args(["--binstubs", binstubs.as_str()])
            .args(["--deployment", "--no-clean"])
            .with_env(&install_env)
            .current_dir(self.layout.root());

        ui::detail(&self.ui, &format!("Running: {}", install));
        let result = self.executor.pipe(&install).await?;
        drop(scratch);

        if !result.success() {
            warn!("bundle install exited with {:?}", result.code);
            return Err(RubypackError::dependency_install(result.output, result.stderr));
        }

        info!("Bundle installed");
        ui::detail(&self.ui, "Cleaning up the bundler cache.");
        let clean = CommandSpec::new(runtime_bin.join("bundle"))
            .arg("clean")
            .with_env(env)
            .current_dir(self.layout.root());
        let cleaned = self.executor.run(&clean).await?;
        if !cleaned.success() {
            warn!("bundle clean exited with {:?}", cleaned.code);
        }

        self.cache.store(BUNDLE_CONFIG_DIR)?;
        self.cache.store(BUNDLE_PATH)?;
        self.cache
            .write_metadata(&CacheMetadata::new(version, lockfile))?;

        fsutil::remove_path(&self.layout.gem_dir(version).join("cache"))?;

        Ok(InstallReport {
            bundler_version,
            reused_cache,
        })
    }

    async fn install_bundler(
        &self,
        version: &RuntimeVersion,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<()> {
        let cmd = CommandSpec::new(self.layout.runtime_bin(version).join("gem"))
            .args(["install", "bundler"])
            .arg(format!("-v={}", self.options.bundler_version))
            .arg("--no-document")
            .with_env(env)
            .current_dir(self.layout.root());

        let result = self.executor.run(&cmd).await?;
        if !result.stdout.trim().is_empty() {
            ui::detail(&self.ui, result.stdout.trim_end());
        }
        if !result.success() {
            warn!("{} exited with {:?}", cmd, result.code);
        }
        Ok(())
    }

    /// Restore `vendor/bundle` unless it was built for another Ruby
    fn restore_gems(
        &self,
        version: &RuntimeVersion,
        lockfile: &LockedDependencySet,
    ) -> RubypackResult<bool> {
        if let Some(metadata) = self.cache.read_metadata() {
            if !metadata.is_compatible_with(version) {
                ui::detail(
                    &self.ui,
                    &format!(
                        "Ruby changed from {} to {}, reinstalling all gems",
                        metadata.ruby_version, version
                    ),
                );
                return Ok(false);
            }
            if !metadata.matches_lockfile(lockfile) {
                debug!(
                    "Lockfile changed since cache was stored ({} -> {})",
                    metadata.lockfile_digest, lockfile.digest
                );
            }
        }
        self.cache.restore(BUNDLE_PATH)
    }
}
