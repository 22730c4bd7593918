//! External command execution
//!
//! `ProcessExecutor` is the only place child processes are spawned. Every
//! invocation returns an explicit `ProcessResult`; callers decide what a
//! non-zero exit means. The build-time environment is applied to the child
//! here and nowhere else.

mod system;
#[cfg(test)]
pub(crate) mod testing;

pub use system::SystemExecutor;

use crate::env::EnvironmentVariableSet;
use crate::error::RubypackResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// A command to run, with the exact environment the child should see
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    env: Option<BTreeMap<String, String>>,
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command for the given program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: None,
            current_dir: None,
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the child with exactly the variables of `env` (nothing else is inherited)
    pub fn with_env(mut self, env: &EnvironmentVariableSet) -> Self {
        self.env = Some(env.vars());
        self
    }

    /// Set the working directory of the child
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Look up a variable in the child's environment, if one was set
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .as_ref()
            .and_then(|env| env.get(key))
            .map(String::as_str)
    }

    /// Whether the child's environment defines `key` at all
    pub fn has_env_var(&self, key: &str) -> bool {
        self.env_var(key).is_some()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Build the tokio command, applying the environment
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref env) = self.env {
            cmd.env_clear();
            cmd.envs(env);
        }
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, `None` if the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// stdout and stderr interleaved in arrival order (streamed runs) or
    /// concatenated (captured runs)
    pub output: String,
}

impl ProcessResult {
    /// Build a result from separately captured streams
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stdout = stdout.into();
        let stderr = stderr.into();
        let output = format!("{}{}", stdout, stderr);
        Self {
            code,
            stdout,
            stderr,
            output,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands on behalf of the build
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run a command to completion, capturing its output
    async fn run(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult>;

    /// Run a command to completion, streaming its output to the build log
    /// while capturing it
    async fn pipe(&self, cmd: &CommandSpec) -> RubypackResult<ProcessResult>;

    /// Run a command and return its stdout without trailing whitespace
    async fn run_stdout(&self, cmd: &CommandSpec) -> RubypackResult<String> {
        let result = self.run(cmd).await?;
        if !result.success() {
            debug!("{} exited with {:?}", cmd, result.code);
        }
        Ok(result.stdout.trim_end().to_string())
    }
}

/// Lines read from a streamed child process
#[derive(Debug, Default)]
pub(crate) struct StreamedOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub combined: Vec<String>,
}

/// Stream stdout+stderr from a child process, calling `on_line` for each line.
///
/// Lines are read as raw bytes and decoded lossily, so output that is not
/// valid UTF-8 is still drained to EOF. Returns every line read, per stream
/// and interleaved, for the caller's `ProcessResult`.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_line: &(dyn Fn(&str) + Send + Sync),
) -> StreamedOutput {
    let mut collected = StreamedOutput::default();

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return collected;
    };

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    // Partial reads survive a lost select! race and are completed next turn
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = stdout_reader.read_until(b'\n', &mut stdout_buf), if !stdout_done => {
                match read {
                    Ok(0) => stdout_done = true,
                    Ok(_) => {
                        let line = take_line(&mut stdout_buf);
                        on_line(&line);
                        collected.combined.push(line.clone());
                        collected.stdout.push(line);
                    }
                    Err(e) => {
                        debug!("stdout read failed: {}", e);
                        stdout_done = true;
                    }
                }
            }
            read = stderr_reader.read_until(b'\n', &mut stderr_buf), if !stderr_done => {
                match read {
                    Ok(0) => stderr_done = true,
                    Ok(_) => {
                        let line = take_line(&mut stderr_buf);
                        on_line(&line);
                        collected.combined.push(line.clone());
                        collected.stderr.push(line);
                    }
                    Err(e) => {
                        debug!("stderr read failed: {}", e);
                        stderr_done = true;
                    }
                }
            }
        }
    }

    collected
}

/// Decode one buffered line without its terminator and reset the buffer
fn take_line(buf: &mut Vec<u8>) -> String {
    let mut end = buf.len();
    if buf.ends_with(b"\n") {
        end -= 1;
        if buf[..end].ends_with(b"\r") {
            end -= 1;
        }
    }
    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.clear();
    line
}
