//! `Gemfile.lock` parsing
//!
//! Only the parts the build needs are read: gem specs with their source,
//! platforms, the declared Ruby version and the Bundler version that wrote
//! the file. Unknown sections are skipped.

use crate::error::{RubypackError, RubypackResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Values Bundler uses when a Gemfile declares no Ruby version
const UNSPECIFIED_MARKERS: &[&str] = &["unspecified", "No ruby version specified"];

/// Where a locked gem comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A gem server (`GEM` section)
    Rubygems,
    /// A git repository (`GIT` section)
    Git,
    /// A local path (`PATH` section)
    Path,
}

impl SourceKind {
    fn from_header(header: &str) -> Option<Self> {
        match header {
            "GEM" => Some(Self::Rubygems),
            "GIT" => Some(Self::Git),
            "PATH" => Some(Self::Path),
            _ => None,
        }
    }
}

/// Source of a locked gem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSource {
    pub kind: SourceKind,
    /// `remote:` of the section (URL, repository or directory)
    pub remote: String,
}

/// A single locked gem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedSpec {
    pub name: String,
    /// Version, including a platform suffix when the gem has one
    pub version: String,
    pub source: SpecSource,
}

/// Parsed contents of `Gemfile.lock`
#[derive(Debug, Clone, Default)]
pub struct LockedDependencySet {
    /// Path the lockfile was read from
    pub path: PathBuf,
    pub specs: Vec<LockedSpec>,
    pub platforms: Vec<String>,
    /// Raw `RUBY VERSION` entry, e.g. `ruby 3.0.2p107`
    pub ruby_version: Option<String>,
    /// `BUNDLED WITH` entry
    pub bundled_with: Option<String>,
    /// SHA256 of the file contents (first 12 hex chars)
    pub digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Source(SourceKind),
    Platforms,
    RubyVersion,
    BundledWith,
    Other,
}

impl LockedDependencySet {
    /// Read and parse the lockfile at `path`, `None` if it does not exist
    pub fn load(path: &Path) -> RubypackResult<Option<Self>> {
        if !path.is_file() {
            debug!("No lockfile at {}", path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(path).map_err(|e| RubypackError::LockfileRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut set = Self::parse(&contents);
        set.path = path.to_path_buf();
        debug!(
            "Parsed {}: {} specs, ruby {:?}",
            path.display(),
            set.specs.len(),
            set.ruby_version
        );
        Ok(Some(set))
    }

    /// Parse lockfile contents
    pub fn parse(contents: &str) -> Self {
        let mut set = Self {
            digest: digest(contents.as_bytes()),
            ..Self::default()
        };

        let mut section = Section::Other;
        let mut remote = String::new();
        let mut in_specs = false;

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let indent = line.len() - line.trim_start().len();
            let text = line.trim();

            if indent == 0 {
                section = match text {
                    "PLATFORMS" => Section::Platforms,
                    "RUBY VERSION" => Section::RubyVersion,
                    "BUNDLED WITH" => Section::BundledWith,
                    other => SourceKind::from_header(other)
                        .map(Section::Source)
                        .unwrap_or(Section::Other),
                };
                remote.clear();
                in_specs = false;
                continue;
            }

            match section {
                Section::Source(kind) => {
                    if indent == 2 {
                        if let Some(value) = text.strip_prefix("remote:") {
                            remote = value.trim().to_string();
                        }
                        in_specs = text == "specs:";
                    } else if indent == 4 && in_specs {
                        if let Some((name, version)) = parse_spec_line(text) {
                            set.specs.push(LockedSpec {
                                name,
                                version,
                                source: SpecSource {
                                    kind,
                                    remote: remote.clone(),
                                },
                            });
                        }
                    }
                    // Deeper lines are a spec's own dependencies
                }
                Section::Platforms => set.platforms.push(text.to_string()),
                Section::RubyVersion => set.ruby_version = Some(text.to_string()),
                Section::BundledWith => set.bundled_with = Some(text.to_string()),
                Section::Other => {}
            }
        }

        set
    }

    /// The declared Ruby version, `None` when absent or unspecified
    pub fn declared_ruby_version(&self) -> Option<&str> {
        self.ruby_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !is_unspecified(v))
    }

    /// Whether the lockfile leaves the Ruby version open
    pub fn ruby_version_unspecified(&self) -> bool {
        self.declared_ruby_version().is_none()
    }

    /// Whether a gem with this name is in the bundle
    pub fn includes(&self, name: &str) -> bool {
        self.specs.iter().any(|spec| spec.name == name)
    }
}

/// Whether `value` is one of the markers for "no Ruby version declared"
pub fn is_unspecified(value: &str) -> bool {
    UNSPECIFIED_MARKERS
        .iter()
        .any(|marker| value.eq_ignore_ascii_case(marker))
}

/// Parse `name (version)`
fn parse_spec_line(text: &str) -> Option<(String, String)> {
    let (name, rest) = text.split_once(" (")?;
    let version = rest.strip_suffix(')')?;
    Some((name.to_string(), version.to_string()))
}

/// Hash content using SHA256, returning first 12 hex chars
fn digest(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    hex::encode(&result[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCKFILE: &str = "GIT
  remote: https://github.com/rails/rails.git
  revision: 5b1c0a2
  specs:
    activesupport (7.1.0.alpha)
      concurrent-ruby (~> 1.0, >= 1.0.2)

GEM
  remote: https://rubygems.org/
  specs:
    concurrent-ruby (1.1.9)
    nokogiri (1.13.1-x86_64-linux)
      racc (~> 1.4)
    racc (1.6.0)
    rake (13.0.6)

PLATFORMS
  ruby
  x86_64-linux

DEPENDENCIES
  activesupport!
  nokogiri
  rake

RUBY VERSION
   ruby 3.0.2p107

BUNDLED WITH
   2.2.22
";

    #[test]
    fn parses_specs_in_order_with_sources() {
        let set = LockedDependencySet::parse(LOCKFILE);

        let names: Vec<&str> = set.specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["activesupport", "concurrent-ruby", "nokogiri", "racc", "rake"]
        );

        assert_eq!(set.specs[0].source.kind, SourceKind::Git);
        assert_eq!(set.specs[0].source.remote, "https://github.com/rails/rails.git");
        assert_eq!(set.specs[2].version, "1.13.1-x86_64-linux");
        assert_eq!(set.specs[2].source.kind, SourceKind::Rubygems);
        assert!(set.includes("rake"));
        assert!(!set.includes("execjs"));
    }

    #[test]
    fn parses_trailing_sections() {
        let set = LockedDependencySet::parse(LOCKFILE);

        assert_eq!(set.platforms, vec!["ruby", "x86_64-linux"]);
        assert_eq!(set.declared_ruby_version(), Some("ruby 3.0.2p107"));
        assert_eq!(set.bundled_with.as_deref(), Some("2.2.22"));
    }

    #[test]
    fn missing_ruby_version_is_unspecified() {
        let set = LockedDependencySet::parse("GEM\n  remote: https://rubygems.org/\n  specs:\n    rake (13.0.6)\n");
        assert!(set.ruby_version.is_none());
        assert!(set.ruby_version_unspecified());
    }

    #[test]
    fn literal_unspecified_is_unspecified() {
        let set = LockedDependencySet::parse("RUBY VERSION\n   unspecified\n");
        assert_eq!(set.ruby_version.as_deref(), Some("unspecified"));
        assert!(set.ruby_version_unspecified());

        let set = LockedDependencySet::parse("RUBY VERSION\n   No ruby version specified\n");
        assert!(set.ruby_version_unspecified());
    }

    #[test]
    fn digest_is_deterministic() {
        let first = LockedDependencySet::parse(LOCKFILE);
        let second = LockedDependencySet::parse(LOCKFILE);
        let other = LockedDependencySet::parse("GEM\n");

        assert_eq!(first.digest, second.digest);
        assert_eq!(first.digest.len(), 12);
        assert_ne!(first.digest, other.digest);
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let loaded = LockedDependencySet::load(&dir.path().join("Gemfile.lock")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_records_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Gemfile.lock");
        fs::write(&path, LOCKFILE).unwrap();

        let set = LockedDependencySet::load(&path).unwrap().unwrap();
        assert_eq!(set.path, path);
        assert_eq!(set.specs.len(), 5);
    }
}
