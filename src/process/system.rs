//! Process executor backed by `tokio::process`

use super::{stream_child_output, CommandSpec, ProcessExecutor, ProcessResult};
use crate::error::{RubypackError, RubypackResult};
use crate::ui;
use async_trait::async_trait;
use std::process::Stdio;
use tracing::debug;

/// Executor that spawns real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    /// Echo streamed output to the build log (disabled in quiet contexts)
    echo: bool,
}

impl SystemExecutor {
    /// Create an executor that echoes piped output
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Create an executor that captures piped output without echoing it
    pub fn quiet() -> Self {
        Self { echo: false }
    }
}

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn run(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult> {
        debug!("Executing: {}", cmd);

        let output = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RubypackError::process_spawn(cmd.to_string(), e))?;

        Ok(ProcessResult::new(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }

    async fn pipe(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult> {
        debug!("Streaming: {}", cmd);

        let mut child = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RubypackError::process_spawn(cmd.to_string(), e))?;

        let echo = self.echo;
        let streamed = stream_child_output(&mut child, &move |line: &str| {
            if echo {
                ui::stream_line(line);
            }
        })
        .await;

        let status = child
            .wait()
            .await
            .map_err(|e| RubypackError::process_spawn(cmd.to_string(), e))?;

        let join = |lines: &[String]| {
            lines.iter().map(|l| format!("{}\n", l)).collect::<String>()
        };

        Ok(ProcessResult {
            code: status.code(),
            stdout: join(&streamed.stdout),
            stderr: join(&streamed.stderr),
            output: join(&streamed.combined),
        })
    }
}
