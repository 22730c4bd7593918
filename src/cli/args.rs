//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// rubypack - Ruby buildpack compiler
///
/// Vendors a prebuilt Ruby into an app's build directory and installs its
/// locked gems with Bundler, caching them between builds.
#[derive(Parser, Debug)]
#[command(name = "rubypack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RUBYPACK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the app in BUILD_DIR, using CACHE_DIR between builds
    Compile(CompileArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the compile command
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// App source directory, compiled in place
    pub build_dir: PathBuf,

    /// Directory persisted between builds of the same app
    pub cache_dir: PathBuf,

    /// Ruby version used when Gemfile.lock does not declare one
    #[arg(long, env = "RUBY_VERSION")]
    pub ruby_version: Option<String>,

    /// Bundler groups to skip (colon-separated)
    #[arg(long, env = "BUNDLE_WITHOUT")]
    pub bundle_without: Option<String>,

    /// Directory holding prebuilt runtimes (overrides [runtime] install_root)
    #[arg(long)]
    pub runtime_root: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
