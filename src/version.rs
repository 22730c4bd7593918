//! Ruby version resolution
//!
//! The version is taken from the first source that yields one:
//! 1. the lockfile's `RUBY VERSION` entry, if well formed
//! 2. the `RUBY_VERSION` override, when the lockfile leaves it unspecified
//! 3. a bootstrap Bundler asked for `bundle platform --ruby`
//!
//! Step 3 downloads Bundler, so the result is memoized for the build.

use crate::env::EnvironmentVariableSet;
use crate::error::{RubypackError, RubypackResult};
use crate::fetch::{Artifact, ArtifactFetcher};
use crate::layout::BuildLayout;
use crate::lockfile::{self, LockedDependencySet};
use crate::process::{CommandSpec, ProcessExecutor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable carrying the version override
pub const RUBY_VERSION_VAR: &str = "RUBY_VERSION";

/// Where a resolved version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    Lockfile,
    Environment,
    Probe,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lockfile => "Gemfile.lock",
            Self::Environment => RUBY_VERSION_VAR,
            Self::Probe => "bundle platform",
        };
        write!(f, "{}", name)
    }
}

/// A resolved Ruby version, e.g. `ruby-3.0.2` or `3.2.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion {
    label: String,
    engine: Option<String>,
    number: String,
    source: VersionSource,
}

impl RuntimeVersion {
    /// Take a label as is, splitting off an engine prefix if present
    pub fn from_label(label: &str, source: VersionSource) -> Self {
        let label = label.trim();
        let (engine, number) = match split_engine(label) {
            Some((engine, number)) => (Some(engine.to_string()), number.to_string()),
            None => (None, label.to_string()),
        };
        Self {
            label: label.to_string(),
            engine,
            number,
            source,
        }
    }

    /// Normalize a declared version (`ruby 3.0.2p107` → `ruby-3.0.2`) and
    /// accept it only if it has the `(engine-)?X.Y.Z` shape
    pub fn parse_declared(raw: &str, source: VersionSource) -> Option<Self> {
        let normalized = normalize(raw);
        is_well_formed(&normalized).then(|| Self::from_label(&normalized, source))
    }

    /// Canonical label; names the vendored runtime directory
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    /// Version number without the engine, e.g. `3.0.2`
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn source(&self) -> VersionSource {
        self.source
    }

    pub fn is_environment_sourced(&self) -> bool {
        self.source == VersionSource::Environment
    }

    /// ABI directory name gems are installed under (`3.0.2` → `3.0.0`)
    pub fn abi_version(&self) -> String {
        let mut parts = self.number.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) if is_digits(major) && is_digits(minor) => {
                format!("{}.{}.0", major, minor)
            }
            _ => self.number.clone(),
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Resolution state; the resolver never runs its sources twice
#[derive(Debug, Clone)]
enum Resolution {
    Unresolved,
    Resolved(RuntimeVersion),
}

/// Resolves the Ruby version for one build
#[derive(Debug)]
pub struct VersionResolver {
    declared: Option<String>,
    unspecified: bool,
    env_override: Option<String>,
    bundler: Artifact,
    build_dir: PathBuf,
    gemfile: PathBuf,
    state: Resolution,
}

impl VersionResolver {
    /// Create a resolver over the lockfile (if any) and the override
    pub fn new(
        lockfile: Option<&LockedDependencySet>,
        env_override: Option<String>,
        bundler: Artifact,
        layout: &BuildLayout,
    ) -> Self {
        Self {
            declared: lockfile.and_then(|l| l.ruby_version.clone()),
            unspecified: lockfile.map_or(true, LockedDependencySet::ruby_version_unspecified),
            env_override: env_override.filter(|v| !v.trim().is_empty()),
            bundler,
            build_dir: layout.root().to_path_buf(),
            gemfile: layout.gemfile(),
            state: Resolution::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, Resolution::Resolved(_))
    }

    /// Resolve the version, running the sources only on the first call
    pub async fn resolve(
        &mut self,
        executor: &dyn ProcessExecutor,
        fetcher: &dyn ArtifactFetcher,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<RuntimeVersion> {
        if let Resolution::Resolved(ref version) = self.state {
            return Ok(version.clone());
        }

        let version = self.resolve_uncached(executor, fetcher, env).await?;
        info!("Resolved Ruby {} from {}", version, version.source());
        self.state = Resolution::Resolved(version.clone());
        Ok(version)
    }

    async fn resolve_uncached(
        &self,
        executor: &dyn ProcessExecutor,
        fetcher: &dyn ArtifactFetcher,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<RuntimeVersion> {
        if let Some(ref raw) = self.declared {
            if let Some(version) = RuntimeVersion::parse_declared(raw, VersionSource::Lockfile) {
                return Ok(version);
            }
            debug!("Lockfile ruby version {:?} is not usable", raw);
        }

        if self.unspecified {
            if let Some(ref value) = self.env_override {
                // The label becomes a directory under vendor/
                if !is_well_formed(value.trim()) {
                    return Err(RubypackError::VersionResolution {
                        reason: format!("{}={:?} is not a Ruby version", RUBY_VERSION_VAR, value),
                    });
                }
                return Ok(RuntimeVersion::from_label(value, VersionSource::Environment));
            }
        }

        self.probe(executor, fetcher, env).await
    }

    /// Ask a bootstrap Bundler which Ruby the Gemfile wants
    async fn probe(
        &self,
        executor: &dyn ProcessExecutor,
        fetcher: &dyn ArtifactFetcher,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<RuntimeVersion> {
        let scratch = tempfile::Builder::new()
            .prefix("bundler-")
            .tempdir()
            .map_err(|e| RubypackError::io("creating bundler scratch directory", e))?;

        let bundler_dir = fetcher.fetch(&self.bundler, scratch.path()).await?;

        let mut probe_env = env.clone();
        probe_env.set_override("GEM_PATH", bundler_dir.display().to_string());
        probe_env.set_override("BUNDLE_GEMFILE", self.gemfile.display().to_string());

        let cmd = CommandSpec::new(bundler_dir.join("bin").join("bundle"))
            .args(["platform", "--ruby"])
            .with_env(&probe_env)
            .current_dir(&self.build_dir);

        let result = executor.run(&cmd).await?;
        if !result.success() {
            return Err(RubypackError::VersionResolution {
                reason: format!(
                    "`bundle platform --ruby` exited with {:?}: {}",
                    result.code,
                    result.stderr.trim()
                ),
            });
        }

        let reported = result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or_default();

        if reported.is_empty() || lockfile::is_unspecified(reported) {
            return Err(RubypackError::VersionResolution {
                reason: format!(
                    "Gemfile.lock declares none, {} is not set and Bundler reported {:?}",
                    RUBY_VERSION_VAR, reported
                ),
            });
        }

        RuntimeVersion::parse_declared(reported, VersionSource::Probe).ok_or_else(|| {
            RubypackError::VersionResolution {
                reason: format!("Bundler reported {:?}, which is not a Ruby version", reported),
            }
        })
    }
}

/// Strip the patch level (`p107`) and join engine and number with `-`
fn normalize(raw: &str) -> String {
    strip_patch_level(raw.trim()).replacen(' ', "-", 1)
}

fn strip_patch_level(value: &str) -> &str {
    if let Some(idx) = value.rfind('p') {
        let (head, tail) = (&value[..idx], &value[idx + 1..]);
        if is_digits(tail) && head.ends_with(|c: char| c.is_ascii_digit()) {
            return head;
        }
    }
    value
}

/// Split `engine-number`; `None` when the label starts with the number
fn split_engine(label: &str) -> Option<(&str, &str)> {
    if label.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let (engine, number) = label.split_once('-')?;
    let valid = !engine.is_empty() && engine.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((engine, number))
}

/// `(engine-)?X.Y.Z` with an optional `.suffix` or `-suffix`
fn is_well_formed(label: &str) -> bool {
    let number = if label.starts_with(|c: char| c.is_ascii_digit()) {
        label
    } else {
        match split_engine(label) {
            Some((_, number)) => number,
            None => return false,
        }
    };

    let mut parts = number.splitn(3, '.');
    let (Some(major), Some(minor), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if !is_digits(major) || !is_digits(minor) {
        return false;
    }

    let patch_len = rest.chars().take_while(char::is_ascii_digit).count();
    if patch_len == 0 {
        return false;
    }

    let suffix = &rest[patch_len..];
    match suffix.chars().next() {
        None => true,
        Some('.') | Some('-') => {
            suffix.len() > 1
                && suffix[1..]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        }
        Some(_) => false,
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
