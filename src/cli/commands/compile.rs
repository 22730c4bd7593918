//! Compile command - vendor Ruby and install gems into a build directory

use crate::cli::args::CompileArgs;
use crate::config::Config;
use crate::env::EnvironmentVariableSet;
use crate::error::{RubypackError, RubypackResult};
use crate::fetch::HttpFetcher;
use crate::hook::HookOutcome;
use crate::pipeline::{BuildContext, BuildOverrides};
use crate::process::SystemExecutor;
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the compile command
pub async fn execute(args: CompileArgs, config: &Config) -> RubypackResult<()> {
    let ctx = UiContext::detect();

    let build_dir = std::fs::canonicalize(&args.build_dir).map_err(|e| {
        RubypackError::io(format!("resolving build dir {}", args.build_dir.display()), e)
    })?;
    std::fs::create_dir_all(&args.cache_dir).map_err(|e| {
        RubypackError::io(format!("creating cache dir {}", args.cache_dir.display()), e)
    })?;
    debug!(
        "Compiling {} with cache {}",
        build_dir.display(),
        args.cache_dir.display()
    );

    let overrides = BuildOverrides {
        ruby_version: args.ruby_version,
        bundle_without: args.bundle_without,
        runtime_root: args.runtime_root,
    };

    let executor = SystemExecutor::new();
    let fetcher = HttpFetcher::new(config.vendor.base_url.clone(), ctx.clone());
    let platform_env = EnvironmentVariableSet::inherit();

    let build = BuildContext::new(
        config,
        overrides,
        build_dir,
        args.cache_dir,
        &executor,
        &fetcher,
        ctx.clone(),
    );

    let summary = build.compile(&platform_env).await?;

    let hook = match summary.hook {
        HookOutcome::NotDefined => "no post-install task".to_string(),
        HookOutcome::Completed { elapsed } => {
            format!("post-install task took {:.2}s", elapsed.as_secs_f64())
        }
        HookOutcome::Failed { code: Some(code), .. } => {
            format!("post-install task failed with exit code {}", code)
        }
        HookOutcome::Failed { code: None, .. } => "post-install task did not finish".to_string(),
        HookOutcome::NotRun { reason } => format!("post-install task could not start: {}", reason),
    };
    ui::topic(
        &ctx,
        &format!(
            "Compiled with Ruby {} ({}, {})",
            summary.version,
            if summary.install.reused_cache {
                "cached gems reused"
            } else {
                "fresh gem install"
            },
            hook
        ),
    );

    Ok(())
}
