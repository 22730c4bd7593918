//! Error types for rubypack
//!
//! All modules use `RubypackResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rubypack operations
pub type RubypackResult<T> = Result<T, RubypackError>;

/// Max number of installer output lines shown for a dependency install error.
const INSTALL_ERROR_TAIL_LINES: usize = 50;

/// All errors that can occur while compiling a Ruby build
#[derive(Error, Debug)]
pub enum RubypackError {
    // Build-fatal errors
    #[error("Gemfile.lock is required. Please run \"bundle install\" locally\nand commit your Gemfile.lock.")]
    MissingLockfile { path: PathBuf },

    #[error("Unable to determine the Ruby version: {reason}")]
    VersionResolution { reason: String },

    #[error("No prebuilt Ruby {version} found at {path}")]
    Provisioning { version: String, path: PathBuf },

    #[error("Failed to install gems via Bundler.\n{}", tail_lines(.output, INSTALL_ERROR_TAIL_LINES))]
    DependencyInstall { output: String, stderr: String },

    // Process errors
    #[error("Command could not be started: {command}")]
    ProcessExecution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Artifact errors
    #[error("Failed to fetch {artifact}: {reason}")]
    Fetch { artifact: String, reason: String },

    // Lockfile errors
    #[error("Failed to read lockfile {path}: {reason}")]
    LockfileRead { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl RubypackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an error for a command that could not be spawned
    pub fn process_spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessExecution {
            command: command.into(),
            source,
        }
    }

    /// Create a dependency install error from the installer's full output
    pub fn dependency_install(output: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::DependencyInstall {
            output: output.into(),
            stderr: stderr.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingLockfile { .. } => {
                Some("Run: bundle install && git add Gemfile.lock && git commit")
            }
            Self::VersionResolution { .. } => {
                Some("Declare a ruby version in your Gemfile or set RUBY_VERSION")
            }
            Self::Provisioning { .. } => {
                Some("Choose a supported Ruby version or check [runtime] install_root")
            }
            Self::ProcessExecution { .. } => Some("Check that the command exists and is executable"),
            _ => None,
        }
    }
}

/// Last `count` lines of `text`
fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
