//! rubypack - Ruby buildpack compiler
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use rubypack::cli::{Cli, Commands};
use rubypack::config::ConfigManager;
use rubypack::error::RubypackResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RubypackResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("rubypack=warn"),
        1 => EnvFilter::new("rubypack=info"),
        _ => EnvFilter::new("rubypack=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    match cli.command {
        Commands::Compile(args) => rubypack::cli::commands::compile(args, &config).await,
        Commands::Config(args) => {
            rubypack::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
