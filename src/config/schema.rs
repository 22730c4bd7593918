//! Configuration schema for rubypack
//!
//! Configuration is stored at `~/.config/rubypack/config.toml`. Every key
//! is optional; missing sections fall back to the defaults below.

use crate::env::DEFAULT_LANG;
use crate::hook::DEFAULT_TASK;
use crate::provision::DEFAULT_INSTALL_ROOT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prebuilt runtime settings
    pub runtime: RuntimeConfig,

    /// Bundler settings
    pub bundler: BundlerConfig,

    /// Remote vendor artifacts
    pub vendor: VendorConfig,

    /// Build environment settings
    pub build: BuildConfig,
}

/// Where prebuilt runtimes live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding one prebuilt Ruby per version number
    pub install_root: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from(DEFAULT_INSTALL_ROOT),
        }
    }
}

/// Bundler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Bundler version installed into the vendored runtime and used to
    /// probe the Ruby version
    pub version: String,

    /// Groups to skip (`BUNDLE_WITHOUT` takes precedence)
    pub without: Option<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            version: "2.0.2".to_string(),
            without: None,
        }
    }
}

/// Vendor bucket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Base URL artifacts are downloaded from
    pub base_url: String,

    /// libyaml version used for native gem builds
    pub libyaml_version: String,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://s3.amazonaws.com/heroku-buildpack-ruby".to_string(),
            libyaml_version: "0.1.4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default locale for the build and the running app
    pub lang: String,

    /// Rake task run after install when the app defines it
    pub post_install_task: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            post_install_task: DEFAULT_TASK.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[runtime]"));
        assert!(toml.contains("[vendor]"));
        assert!(toml.contains("install_root = \"/opt/ruby\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bundler.version, "2.0.2");
        assert_eq!(config.build.post_install_task, "assets:precompile");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [bundler]
            without = "development"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bundler.without.as_deref(), Some("development"));
        assert_eq!(config.bundler.version, "2.0.2"); // default preserved
        assert_eq!(config.vendor.libyaml_version, "0.1.4");
    }
}
