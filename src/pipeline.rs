//! The compile pipeline
//!
//! Stages run strictly in order and the first fatal error aborts the build:
//!
//! 1. remove a `vendor/bundle` checked into the app
//! 2. resolve the Ruby version
//! 3. vendor the runtime and link its executables
//! 4. compute the build environment and write the app's profile script
//! 5. with `GIT_DIR` unset, install gems and run the post-install task
//!
//! Only the post-install task may fail without failing the build.

use crate::cache::CacheManager;
use crate::config::Config;
use crate::env::{EnvironmentConfigurator, EnvironmentVariableSet, ScopedUnset};
use crate::error::RubypackResult;
use crate::fetch::{Artifact, ArtifactFetcher};
use crate::fsutil;
use crate::hook::{HookOutcome, PostInstallHookRunner};
use crate::install::{DependencyInstaller, InstallOptions, InstallReport};
use crate::layout::{BuildLayout, BUNDLE_PATH};
use crate::lockfile::LockedDependencySet;
use crate::process::{CommandSpec, ProcessExecutor};
use crate::provision::RuntimeProvisioner;
use crate::ui::{self, UiContext};
use crate::version::{RuntimeVersion, VersionResolver, RUBY_VERSION_VAR};
use std::path::PathBuf;
use tracing::{info, warn};

const STALE_BUNDLE_WARNING: &str = "Checking in `vendor/bundle` is not supported. Please remove this directory\n\
and add it to your .gitignore. To vendor your gems with Bundler, use\n\
`bundle pack` instead.";

/// Per-build values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    /// Ruby version to use when the lockfile does not declare one
    pub ruby_version: Option<String>,
    /// Groups to skip during `bundle install`
    pub bundle_without: Option<String>,
    /// Directory holding prebuilt runtimes
    pub runtime_root: Option<PathBuf>,
}

/// What a finished build produced
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub version: RuntimeVersion,
    pub install: InstallReport,
    pub hook: HookOutcome,
}

/// Everything one compile needs
pub struct BuildContext<'a> {
    config: &'a Config,
    overrides: BuildOverrides,
    layout: BuildLayout,
    cache: CacheManager,
    executor: &'a dyn ProcessExecutor,
    fetcher: &'a dyn ArtifactFetcher,
    ui: UiContext,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        config: &'a Config,
        overrides: BuildOverrides,
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        executor: &'a dyn ProcessExecutor,
        fetcher: &'a dyn ArtifactFetcher,
        ui: UiContext,
    ) -> Self {
        let build_dir = build_dir.into();
        Self {
            config,
            overrides,
            layout: BuildLayout::new(build_dir.clone()),
            cache: CacheManager::new(build_dir, cache_dir),
            executor,
            fetcher,
            ui,
        }
    }

    /// Compile the app in the build directory.
    ///
    /// `platform_env` is the environment the build was started with; it is
    /// never modified.
    pub async fn compile(
        &self,
        platform_env: &EnvironmentVariableSet,
    ) -> RubypackResult<BuildSummary> {
        self.remove_stale_bundle()?;

        let lockfile = LockedDependencySet::load(&self.layout.lockfile())?;
        let version = self.resolve_version(lockfile.as_ref(), platform_env).await?;

        let install_root = self
            .overrides
            .runtime_root
            .clone()
            .unwrap_or_else(|| self.config.runtime.install_root.clone());
        RuntimeProvisioner::new(install_root, self.layout.clone()).provision(&version)?;

        let configurator = EnvironmentConfigurator::new(&self.layout, &version)
            .with_lang(self.config.build.lang.clone());
        let mut env = configurator.build_time_env(platform_env);
        configurator.write_profile()?;
        self.report_ruby(&version, &env).await;

        let guarded = ScopedUnset::new(&mut env, "GIT_DIR");
        let install = self
            .installer()
            .install(&version, lockfile.as_ref(), &guarded)
            .await?;
        let hook = self.run_hook(&guarded).await;
        drop(guarded);

        info!("Compiled with Ruby {}", version);
        Ok(BuildSummary {
            version,
            install,
            hook,
        })
    }

    fn remove_stale_bundle(&self) -> RubypackResult<()> {
        let stale = self.layout.bundle_dir();
        if !stale.exists() {
            return Ok(());
        }

        ui::topic(&self.ui, "WARNING:  Removing `vendor/bundle`.");
        ui::detail(&self.ui, STALE_BUNDLE_WARNING);
        warn!("Removing checked-in {}", BUNDLE_PATH);
        fsutil::remove_path(&stale)
    }

    async fn resolve_version(
        &self,
        lockfile: Option<&LockedDependencySet>,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<RuntimeVersion> {
        let mut resolver = VersionResolver::new(
            lockfile,
            self.overrides.ruby_version.clone(),
            Artifact::bundler(&self.config.bundler.version),
            &self.layout,
        );
        let version = resolver.resolve(self.executor, self.fetcher, env).await?;

        if version.is_environment_sourced() {
            ui::warning_block(
                &self.ui,
                &format!(
                    "Using {}={} because Gemfile.lock does not declare a Ruby version.\n\
                     Declare it in your Gemfile to make builds reproducible.",
                    RUBY_VERSION_VAR, version
                ),
            );
        }
        Ok(version)
    }

    /// Show the vendored `ruby -v`; informational only
    async fn report_ruby(&self, version: &RuntimeVersion, env: &EnvironmentVariableSet) {
        let cmd = CommandSpec::new(self.layout.bin_dir().join("ruby"))
            .arg("-v")
            .with_env(env)
            .current_dir(self.layout.root());
        let reported = match self.executor.run_stdout(&cmd).await {
            Ok(reported) => reported,
            Err(e) => {
                warn!("{} could not run: {}", cmd, e);
                String::new()
            }
        };

        if reported.is_empty() {
            ui::topic(&self.ui, &format!("Using Ruby version: {}", version));
        } else {
            ui::topic(
                &self.ui,
                &format!("Using Ruby version: {} ({})", version, reported),
            );
        }
    }

    fn installer(&self) -> DependencyInstaller<'_> {
        let without = self
            .overrides
            .bundle_without
            .clone()
            .or_else(|| self.config.bundler.without.clone());

        DependencyInstaller::new(
            &self.layout,
            &self.cache,
            self.executor,
            self.fetcher,
            self.ui.clone(),
            InstallOptions {
                bundler_version: self.config.bundler.version.clone(),
                libyaml_version: self.config.vendor.libyaml_version.clone(),
                without,
            },
        )
    }

    /// Run the post-install task; nothing here fails the build
    async fn run_hook(&self, env: &EnvironmentVariableSet) -> HookOutcome {
        let task = &self.config.build.post_install_task;
        if task.trim().is_empty() {
            return HookOutcome::NotDefined;
        }

        let runner = PostInstallHookRunner::new(&self.layout, self.executor, self.ui.clone());
        match runner.run_if_defined(task, env).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("rake {} could not run: {}", task, e);
                ui::warning(&self.ui, &format!("rake {} could not run: {}", task, e));
                HookOutcome::NotRun {
                    reason: e.to_string(),
                }
            }
        }
    }
}
