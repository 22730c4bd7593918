//! Post-install rake task (asset precompilation by default)

use crate::env::EnvironmentVariableSet;
use crate::error::RubypackResult;
use crate::layout::BuildLayout;
use crate::process::{CommandSpec, ProcessExecutor};
use crate::ui::{self, UiContext};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Task run after gems are installed unless configured otherwise
pub const DEFAULT_TASK: &str = "assets:precompile";

/// Result of a hook run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// The app's Rakefile does not define the task
    NotDefined,
    Completed { elapsed: Duration },
    /// The task ran and failed; the build carries on
    Failed { elapsed: Duration, code: Option<i32> },
    /// The task could not be started
    NotRun { reason: String },
}

impl HookOutcome {
    /// Wall-clock time of the real run, if there was one
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::NotDefined | Self::NotRun { .. } => None,
            Self::Completed { elapsed } | Self::Failed { elapsed, .. } => Some(*elapsed),
        }
    }
}

/// Runs a rake task through Bundler if the app defines it
pub struct PostInstallHookRunner<'a> {
    layout: &'a BuildLayout,
    executor: &'a dyn ProcessExecutor,
    ui: UiContext,
}

impl<'a> PostInstallHookRunner<'a> {
    pub fn new(layout: &'a BuildLayout, executor: &'a dyn ProcessExecutor, ui: UiContext) -> Self {
        Self {
            layout,
            executor,
            ui,
        }
    }

    /// Run `task` if a dry run shows it is defined.
    ///
    /// Errors only when a command cannot be started; a failing task is
    /// reported as [`HookOutcome::Failed`].
    pub async fn run_if_defined(
        &self,
        task: &str,
        env: &EnvironmentVariableSet,
    ) -> RubypackResult<HookOutcome> {
        if !self.is_defined(task, env).await? {
            debug!("rake task {} not defined", task);
            return Ok(HookOutcome::NotDefined);
        }

        let mut task_env = env.clone();
        task_env.append("PATH", self.layout.bin_dir().display().to_string());
        let cmd = self.rake(task).with_env(&task_env);

        ui::topic(&self.ui, &format!("Running: rake {}", task));
        let started = Instant::now();
        let result = self.executor.pipe(&cmd).await?;
        let elapsed = started.elapsed();

        if result.success() {
            info!("rake {} finished in {:.2}s", task, elapsed.as_secs_f64());
            ui::detail(
                &self.ui,
                &format!("{} completed ({:.2}s)", task, elapsed.as_secs_f64()),
            );
            Ok(HookOutcome::Completed { elapsed })
        } else {
            warn!("rake {} exited with {:?}", task, result.code);
            ui::warning(&self.ui, &format!("rake {} failed, continuing", task));
            Ok(HookOutcome::Failed {
                elapsed,
                code: result.code,
            })
        }
    }

    async fn is_defined(&self, task: &str, env: &EnvironmentVariableSet) -> RubypackResult<bool> {
        let cmd = self.rake(task).arg("--dry-run").with_env(env);
        Ok(self.executor.run(&cmd).await?.success())
    }

    fn rake(&self, task: &str) -> CommandSpec {
        CommandSpec::new("bundle")
            .args(["exec", "rake", task])
            .current_dir(self.layout.root())
    }
}
