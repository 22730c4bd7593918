//! Build-time and persisted environments for a vendored Ruby

use super::EnvironmentVariableSet;
use crate::error::{RubypackError, RubypackResult};
use crate::layout::BuildLayout;
use crate::version::RuntimeVersion;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Locale used when the app does not set `LANG`
pub const DEFAULT_LANG: &str = "en_US.UTF-8";

/// System directories searched after the app's own executables
pub const SYSTEM_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Computes the two environments derived from one resolved version
#[derive(Debug, Clone)]
pub struct EnvironmentConfigurator<'a> {
    layout: &'a BuildLayout,
    version: &'a RuntimeVersion,
    lang: String,
}

impl<'a> EnvironmentConfigurator<'a> {
    pub fn new(layout: &'a BuildLayout, version: &'a RuntimeVersion) -> Self {
        Self {
            layout,
            version,
            lang: DEFAULT_LANG.to_string(),
        }
    }

    /// Use `lang` instead of [`DEFAULT_LANG`]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Environment for every process the rest of the build spawns.
    ///
    /// Paths are absolute build-directory paths. Inherited search paths are
    /// kept after the ones added here.
    pub fn build_time_env(&self, inherited: &EnvironmentVariableSet) -> EnvironmentVariableSet {
        let mut env = inherited.clone();
        let runtime = self.layout.runtime_dir(self.version);
        let gem_dir = self.layout.gem_dir(self.version);

        env.prepend("LD_LIBRARY_PATH", display(runtime.join("lib")));
        env.set_default("LANG", self.lang.clone());
        env.set_default("GEM_PATH", display(gem_dir.clone()));
        env.set_override("GEM_HOME", display(gem_dir.clone()));

        let search = [
            display(self.layout.bin_dir()),
            display(gem_dir.join("bin")),
            SYSTEM_PATH.to_string(),
        ]
        .join(":");
        env.prepend("PATH", search);
        env.prepend("PATH", display(runtime.join("bin")));

        debug!("Build PATH: {}", env.get("PATH").unwrap_or_default());
        env
    }

    /// Environment the running app starts with, relative to `$HOME`
    pub fn persisted_profile(&self) -> EnvironmentVariableSet {
        let gem_dir = self.layout.gem_dir_rel(self.version);
        let mut env = EnvironmentVariableSet::new();

        env.set_default("GEM_PATH", format!("$HOME/{}", gem_dir));
        env.set_default("LANG", self.lang.clone());
        env.set_override("PATH", format!("$HOME/bin:$HOME/{}/bin:$PATH", gem_dir));
        env
    }

    /// Render [`persisted_profile`](Self::persisted_profile) into
    /// `.profile.d/ruby.sh`
    pub fn write_profile(&self) -> RubypackResult<PathBuf> {
        let path = self.layout.profile_script();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RubypackError::io(format!("creating {}", parent.display()), e))?;
        }

        fs::write(&path, self.persisted_profile().render_profile())
            .map_err(|e| RubypackError::io(format!("writing {}", path.display()), e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

fn display(path: PathBuf) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionSource;
    use tempfile::TempDir;

    fn version() -> RuntimeVersion {
        RuntimeVersion::from_label("ruby-3.0.2", VersionSource::Lockfile)
    }

    #[test]
    fn build_path_order_keeps_inherited() {
        let layout = BuildLayout::new("/tmp/build");
        let version = version();
        let inherited = EnvironmentVariableSet::from_vars([("PATH", "/opt/tools/bin")]);

        let env = EnvironmentConfigurator::new(&layout, &version).build_time_env(&inherited);

        assert_eq!(
            env.get("PATH"),
            Some(
                "/tmp/build/vendor/ruby-3.0.2/bin:/tmp/build/bin:\
                 /tmp/build/vendor/bundle/ruby/3.0.0/bin:/usr/local/bin:/usr/bin:/bin:\
                 /opt/tools/bin"
            )
        );
    }

    #[test]
    fn build_env_prepends_library_path() {
        let layout = BuildLayout::new("/tmp/build");
        let version = version();
        let inherited = EnvironmentVariableSet::from_vars([("LD_LIBRARY_PATH", "/usr/lib/x")]);

        let env = EnvironmentConfigurator::new(&layout, &version).build_time_env(&inherited);

        assert_eq!(
            env.get("LD_LIBRARY_PATH"),
            Some("/tmp/build/vendor/ruby-3.0.2/lib:/usr/lib/x")
        );
    }

    #[test]
    fn build_env_respects_existing_defaults() {
        let layout = BuildLayout::new("/tmp/build");
        let version = version();
        let inherited = EnvironmentVariableSet::from_vars([
            ("LANG", "C.UTF-8"),
            ("GEM_HOME", "/elsewhere"),
        ]);

        let env = EnvironmentConfigurator::new(&layout, &version).build_time_env(&inherited);

        assert_eq!(env.get("LANG"), Some("C.UTF-8"));
        assert_eq!(env.get("GEM_PATH"), Some("/tmp/build/vendor/bundle/ruby/3.0.0"));
        assert_eq!(env.get("GEM_HOME"), Some("/tmp/build/vendor/bundle/ruby/3.0.0"));
    }

    #[test]
    fn persisted_profile_is_home_relative() {
        let layout = BuildLayout::new("/tmp/build");
        let version = version();

        let script = EnvironmentConfigurator::new(&layout, &version)
            .persisted_profile()
            .render_profile();

        assert_eq!(
            script,
            "export GEM_PATH=${GEM_PATH:-$HOME/vendor/bundle/ruby/3.0.0}\n\
             export LANG=${LANG:-en_US.UTF-8}\n\
             export PATH=\"$HOME/bin:$HOME/vendor/bundle/ruby/3.0.0/bin:$PATH\"\n"
        );
    }

    #[test]
    fn persisted_profile_ignores_build_env() {
        let layout = BuildLayout::new("/tmp/build");
        let version = version();
        let configurator = EnvironmentConfigurator::new(&layout, &version);

        let inherited = EnvironmentVariableSet::from_vars([("CPATH", "/tmp/libyaml/include")]);
        let _ = configurator.build_time_env(&inherited);

        let profile = configurator.persisted_profile();
        assert!(profile.get("CPATH").is_none());
        assert!(profile.get("LD_LIBRARY_PATH").is_none());
    }

    #[test]
    fn write_profile_creates_script() {
        let dir = TempDir::new().unwrap();
        let layout = BuildLayout::new(dir.path());
        let version = version();

        let path = EnvironmentConfigurator::new(&layout, &version)
            .with_lang("de_DE.UTF-8")
            .write_profile()
            .unwrap();

        let script = fs::read_to_string(path).unwrap();
        assert!(script.contains("export LANG=${LANG:-de_DE.UTF-8}"));
    }
}
